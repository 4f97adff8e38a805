//! Application services: every mutation re-checks access against a fresh
//! read of the list and its shares, writes through the store, and then
//! hands the resulting event to the broadcaster. Route handlers stay thin.

pub mod autoremove;
pub mod groups;
pub mod items;
pub mod lists;
pub mod shares;

use pantry_core::{ListId, UserId};

use crate::error::{AppError, Result};
use crate::models::GroceryList;
use crate::policy;
use crate::state::AppState;

/// Load the list and verify read access: owner or any share.
pub(crate) async fn authorize_read(
    state: &AppState,
    principal_id: UserId,
    list_id: ListId,
) -> Result<GroceryList> {
    let list = state
        .store()
        .get_list(list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("list {list_id}")))?;
    let shares = state.store().shares_for_list(list_id).await?;

    if !policy::can_read(principal_id, &list, &shares) {
        return Err(AppError::Forbidden("no access to this list".to_owned()));
    }
    Ok(list)
}

/// Load the list and verify edit access: owner or an edit share.
pub(crate) async fn authorize_edit(
    state: &AppState,
    principal_id: UserId,
    list_id: ListId,
) -> Result<GroceryList> {
    let list = state
        .store()
        .get_list(list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("list {list_id}")))?;
    let shares = state.store().shares_for_list(list_id).await?;

    if !policy::can_edit(principal_id, &list, &shares) {
        return Err(AppError::Forbidden(
            "no edit access to this list".to_owned(),
        ));
    }
    Ok(list)
}

/// Load the list and verify ownership. Share management and deletion are
/// never delegable to an editor.
pub(crate) async fn authorize_owner(
    state: &AppState,
    principal_id: UserId,
    list_id: ListId,
) -> Result<GroceryList> {
    let list = state
        .store()
        .get_list(list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("list {list_id}")))?;

    if !policy::is_owner(principal_id, &list) {
        return Err(AppError::Forbidden(
            "only the list owner may do this".to_owned(),
        ));
    }
    Ok(list)
}
