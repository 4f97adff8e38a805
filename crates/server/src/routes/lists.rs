//! List CRUD handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pantry_core::ListId;

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::GroceryList;
use crate::services::lists::{self, ListDetail, ListInput};
use crate::state::AppState;

pub async fn index(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<Vec<GroceryList>>> {
    lists::list_lists(&state, &principal).await.map(Json)
}

pub async fn create(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<ListInput>,
) -> Result<(StatusCode, Json<GroceryList>)> {
    let list = lists::create_list(&state, &principal, input).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn show(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
) -> Result<Json<ListDetail>> {
    lists::get_list_detail(&state, &principal, list_id)
        .await
        .map(Json)
}

pub async fn update(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
    Json(input): Json<ListInput>,
) -> Result<Json<GroceryList>> {
    lists::update_list(&state, &principal, list_id, input)
        .await
        .map(Json)
}

pub async fn destroy(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
    Path(list_id): Path<ListId>,
) -> Result<StatusCode> {
    lists::delete_list(&state, &principal, list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
