//! Sharing handlers: direct shares and single-use magic links.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pantry_core::{ListId, UserId};

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::{GroceryList, ListShare, MagicLink};
use crate::services::shares::{self, MagicLinkInput, ShareInput, ShareUpdate};
use crate::state::AppState;

pub async fn index(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
) -> Result<Json<Vec<ListShare>>> {
    shares::list_shares(&state, &principal, list_id)
        .await
        .map(Json)
}

pub async fn create(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    Json(input): Json<ShareInput>,
) -> Result<(StatusCode, Json<ListShare>)> {
    let share = shares::create_share(&state, &principal, list_id, input).await?;
    Ok((StatusCode::CREATED, Json(share)))
}

pub async fn update(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, user_id)): Path<(ListId, UserId)>,
    Json(input): Json<ShareUpdate>,
) -> Result<StatusCode> {
    shares::update_share(&state, &principal, list_id, user_id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn destroy(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, user_id)): Path<(ListId, UserId)>,
) -> Result<StatusCode> {
    shares::delete_share(&state, &principal, list_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_link(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    Json(input): Json<MagicLinkInput>,
) -> Result<(StatusCode, Json<MagicLink>)> {
    let link = shares::create_magic_link(&state, &principal, list_id, input).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn claim_link(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<GroceryList>> {
    shares::claim_magic_link(&state, &principal, &token)
        .await
        .map(Json)
}
