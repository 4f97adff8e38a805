//! Item handlers. Mutations fan out to the list's realtime room.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pantry_core::{ItemId, ListId};

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::GroceryItem;
use crate::services::items::{self, BoughtInput, ItemInput};
use crate::state::AppState;

pub async fn create(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    Json(input): Json<ItemInput>,
) -> Result<(StatusCode, Json<GroceryItem>)> {
    let item = items::add_item(&state, &principal, list_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, item_id)): Path<(ListId, ItemId)>,
    Json(input): Json<ItemInput>,
) -> Result<Json<GroceryItem>> {
    items::update_item(&state, &principal, list_id, item_id, input)
        .await
        .map(Json)
}

pub async fn set_bought(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, item_id)): Path<(ListId, ItemId)>,
    Json(input): Json<BoughtInput>,
) -> Result<Json<GroceryItem>> {
    items::set_bought(&state, &principal, list_id, item_id, input)
        .await
        .map(Json)
}

pub async fn destroy(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, item_id)): Path<(ListId, ItemId)>,
) -> Result<StatusCode> {
    items::remove_item(&state, &principal, list_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
