//! Wire messages for the realtime WebSocket protocol.
//!
//! JSON with a `type` tag in both directions. List ids travel as strings so
//! a malformed id can be handled as a policy decision (silent no-op) rather
//! than a deserialization failure that would tear down the connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pantry_core::{ItemId, UserId};

use crate::models::GroceryItem;

/// Messages a client sends over the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a list's room, implicitly leaving any room joined earlier.
    JoinList { list_id: String },
    /// Leave the current room.
    LeaveList { list_id: String },
}

/// One entry in an [`ServerEvent::ActiveUsers`] snapshot.
///
/// Users are deduplicated: a user with several tabs open appears once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveUser {
    pub user_id: UserId,
    pub user_name: String,
}

/// Events the server pushes to room members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A user joined the room (sent to everyone already in it).
    UserJoined { user_id: UserId, user_name: String },
    /// A user left the room, explicitly or by disconnecting.
    UserLeft { user_id: UserId, user_name: String },
    /// Snapshot of the room's members, sent only to a joining connection.
    /// Includes the joiner itself, since registration happens before the
    /// snapshot is taken.
    ActiveUsers { users: Vec<ActiveUser> },
    /// An item was added to the list.
    ItemAdded { item: GroceryItem },
    /// An item's fields or group changed.
    ItemUpdated { item: GroceryItem },
    /// An item's bought flag flipped; `bought_at` moves with the flag.
    ItemBoughtStatusChanged {
        id: ItemId,
        is_bought: bool,
        bought_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    },
    /// An item was removed; only the id survives.
    ItemRemoved { id: ItemId },
}
