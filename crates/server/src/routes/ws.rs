//! WebSocket entry point.
//!
//! Browsers cannot set headers on a WebSocket handshake, so the bearer token
//! rides in the `access_token` query parameter instead. A bad token is
//! rejected before the upgrade; everything after the upgrade communicates
//! failures by silence, never by closing the socket.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::decode_principal;
use crate::realtime::hub;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    access_token: String,
}

// The token is verified before the upgrade is accepted: a handshake with a
// bad token gets 401 instead of 101.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let principal = decode_principal(&params.access_token, &state.config().jwt_secret)
        .map_err(|error| AppError::Unauthorized(error.to_string()))?;

    Ok(ws.on_upgrade(move |socket| hub::run(socket, state, principal)))
}
