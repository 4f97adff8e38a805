//! Share management and magic links. Both are owner-only to create;
//! claiming a link is open to any authenticated user holding the token.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use pantry_core::{ListId, Principal, UserId};
use rand::Rng as _;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{GroceryList, ListShare, MagicLink};
use crate::state::AppState;

use super::authorize_owner;

#[derive(Debug, Deserialize)]
pub struct ShareInput {
    pub user_id: UserId,
    pub can_edit: bool,
}

#[derive(Debug, Deserialize)]
pub struct ShareUpdate {
    pub can_edit: bool,
}

#[derive(Debug, Deserialize)]
pub struct MagicLinkInput {
    #[serde(default)]
    pub can_edit: bool,
}

pub async fn list_shares(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
) -> Result<Vec<ListShare>> {
    authorize_owner(state, principal.id, list_id).await?;
    Ok(state.store().shares_for_list(list_id).await?)
}

pub async fn create_share(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    input: ShareInput,
) -> Result<ListShare> {
    authorize_owner(state, principal.id, list_id).await?;
    if input.user_id == principal.id {
        return Err(AppError::BadRequest(
            "cannot share a list with its owner".to_owned(),
        ));
    }
    if state.store().get_user(input.user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("user {}", input.user_id)));
    }

    let share = ListShare {
        list_id,
        shared_with_user_id: input.user_id,
        can_edit: input.can_edit,
        created_at: Utc::now(),
    };
    state.store().create_share(&share).await?;
    Ok(share)
}

pub async fn update_share(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    user_id: UserId,
    input: ShareUpdate,
) -> Result<()> {
    authorize_owner(state, principal.id, list_id).await?;
    if !state
        .store()
        .update_share(list_id, user_id, input.can_edit)
        .await?
    {
        return Err(AppError::NotFound(format!("share for user {user_id}")));
    }
    Ok(())
}

/// Revoke a share. Takes effect at the next access check; the revoked
/// user's live session sees it on their next mutation attempt.
pub async fn delete_share(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    user_id: UserId,
) -> Result<()> {
    authorize_owner(state, principal.id, list_id).await?;
    if !state.store().delete_share(list_id, user_id).await? {
        return Err(AppError::NotFound(format!("share for user {user_id}")));
    }
    Ok(())
}

pub async fn create_magic_link(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    input: MagicLinkInput,
) -> Result<MagicLink> {
    authorize_owner(state, principal.id, list_id).await?;

    let link = MagicLink {
        token: generate_token(),
        list_id,
        can_edit: input.can_edit,
        claimed_by: None,
        created_at: Utc::now(),
    };
    state.store().create_magic_link(&link).await?;
    Ok(link)
}

/// Redeem a single-use link: the first claimer gets a share at the link's
/// permission level (or nothing new, if they already own the list), and the
/// token is spent either way. An unknown or spent token reads as not found.
pub async fn claim_magic_link(
    state: &AppState,
    principal: &Principal,
    token: &str,
) -> Result<GroceryList> {
    state.store().ensure_user(principal).await?;

    let link = state
        .store()
        .claim_magic_link(token, principal.id)
        .await?
        .ok_or_else(|| AppError::NotFound("magic link".to_owned()))?;

    state
        .store()
        .get_list(link.list_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("list {}", link.list_id)))
}

/// 32 random bytes, URL-safe base64. Unguessable and copy-pastable.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}
