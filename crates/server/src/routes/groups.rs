//! Item group handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pantry_core::{GroupId, ListId};

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::ItemGroup;
use crate::services::groups::{self, GroupInput};
use crate::state::AppState;

pub async fn create(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    Json(input): Json<GroupInput>,
) -> Result<(StatusCode, Json<ItemGroup>)> {
    let group = groups::create_group(&state, &principal, list_id, input).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn update(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, group_id)): Path<(ListId, GroupId)>,
    Json(input): Json<GroupInput>,
) -> Result<Json<ItemGroup>> {
    groups::update_group(&state, &principal, list_id, group_id, input)
        .await
        .map(Json)
}

pub async fn destroy(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path((list_id, group_id)): Path<(ListId, GroupId)>,
) -> Result<StatusCode> {
    groups::delete_group(&state, &principal, list_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
