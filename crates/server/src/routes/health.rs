//! Health probes.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness: the process is up and serving.
pub async fn liveness() -> &'static str {
    "OK"
}

/// Readiness: the backing store answers.
pub async fn readiness(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    match state.store().ping().await {
        Ok(()) => Ok("OK"),
        Err(error) => {
            tracing::error!(%error, "readiness probe failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
