//! Current-user handler.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::auth::RequireAuth;
use crate::models::User;
use crate::state::AppState;

/// Return the caller's profile, provisioning the row on first sight.
pub async fn me(
    RequireAuth(principal): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<User>> {
    let user = state.store().ensure_user(&principal).await?;
    Ok(Json(user))
}
