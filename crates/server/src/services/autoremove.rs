//! Delayed removal of bought items.
//!
//! When a list opts in via `auto_remove_after_secs`, flipping an item to
//! bought arms a one-shot timer. The timer carries the `bought_at` epoch it
//! was armed for; on expiry the item is re-read and only deleted if it is
//! still bought *for that same epoch*. An un-bought/re-bought cycle in the
//! meantime changes the epoch and the stale timer fizzles. Timers live only
//! in process memory, so items bought just before a restart simply stay
//! until removed by hand.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pantry_core::{ItemId, ListId};

use crate::error::Result;
use crate::realtime::ServerEvent;
use crate::state::AppState;

/// Arm a one-shot removal timer for `item_id`.
pub fn schedule(
    state: AppState,
    list_id: ListId,
    item_id: ItemId,
    delay: Duration,
    epoch: DateTime<Utc>,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match expire(&state, list_id, item_id, epoch).await {
            Ok(true) => tracing::debug!(%list_id, %item_id, "auto-removed bought item"),
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(%list_id, %item_id, %error, "auto-removal sweep failed");
            }
        }
    });
}

/// Delete `item_id` if it is still the bought item the timer was armed for.
/// Returns whether a deletion happened.
pub async fn expire(
    state: &AppState,
    list_id: ListId,
    item_id: ItemId,
    epoch: DateTime<Utc>,
) -> Result<bool> {
    let Some(item) = state.store().get_item(item_id).await? else {
        return Ok(false);
    };
    // The item may have moved on since the timer was armed: un-bought,
    // re-bought (fresh epoch), or re-parented by a list delete/recreate.
    if item.list_id != list_id || !item.is_bought || item.bought_at != Some(epoch) {
        return Ok(false);
    }

    if !state.store().delete_item(item_id).await? {
        return Ok(false);
    }
    state
        .broadcaster()
        .broadcast(list_id, &ServerEvent::ItemRemoved { id: item_id });
    Ok(true)
}
