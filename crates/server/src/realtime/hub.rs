//! Per-connection session coordination.
//!
//! Lifecycle: `Connected` (authenticated, registered, in no room) ->
//! `Joined(list)` -> back to `Connected` on leave -> `Disconnected`. A
//! connection may cycle through rooms over its lifetime but is in at most
//! one at a time; joining a second list implicitly leaves the first.
//!
//! Join requests that fail - malformed id, no read access, unresolvable
//! user - are rejected silently: a warning is logged and nothing is sent
//! back, so an unauthorized caller learns nothing about the list.
//!
//! The [`join`], [`leave`], and [`disconnect`] functions are the protocol
//! logic; [`run`] wires them to an actual WebSocket. Integration tests
//! drive the functions directly with channel-backed connections.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use pantry_core::{ConnectionId, ListId, Principal};

use crate::policy;
use crate::state::AppState;

use super::broadcast::Broadcaster;
use super::protocol::{ClientMessage, ServerEvent};

/// Register a connection for an authenticated principal, returning its id
/// and the receiving end of its event channel.
///
/// The caller owns draining the receiver; [`run`] forwards it to the
/// socket, tests assert on it directly.
#[must_use]
pub fn connect(
    state: &AppState,
    principal: &Principal,
) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
    let conn_id = ConnectionId::generate();
    let (tx, rx) = mpsc::unbounded_channel();
    state
        .presence()
        .register(conn_id, principal.id, principal.name.clone(), tx);
    (conn_id, rx)
}

/// Handle one parsed client message.
pub async fn handle_message(
    state: &AppState,
    conn_id: ConnectionId,
    principal: &Principal,
    message: ClientMessage,
) {
    match message {
        ClientMessage::JoinList { list_id } => join(state, conn_id, principal, &list_id).await,
        ClientMessage::LeaveList { list_id } => leave(state, conn_id, &list_id),
    }
}

/// Join a list's room.
///
/// Access is checked against a fresh read of the list and its shares, then
/// the registry is updated, then existing members learn `UserJoined`, then
/// the joiner alone gets the `ActiveUsers` snapshot - which already
/// includes the joiner, since the registry join happened first.
pub async fn join(
    state: &AppState,
    conn_id: ConnectionId,
    principal: &Principal,
    raw_list_id: &str,
) {
    let Ok(list_id) = ListId::parse(raw_list_id) else {
        tracing::warn!(%conn_id, raw_list_id, "join rejected: malformed list id");
        return;
    };

    let list = match state.store().get_list(list_id).await {
        Ok(Some(list)) => list,
        Ok(None) => {
            tracing::warn!(%conn_id, %list_id, "join rejected: unknown list");
            return;
        }
        Err(err) => {
            tracing::warn!(%conn_id, %list_id, error = %err, "join failed: list lookup");
            return;
        }
    };

    let shares = match state.store().shares_for_list(list_id).await {
        Ok(shares) => shares,
        Err(err) => {
            tracing::warn!(%conn_id, %list_id, error = %err, "join failed: share lookup");
            return;
        }
    };

    if !policy::can_read(principal.id, &list, &shares) {
        tracing::warn!(%conn_id, %list_id, user_id = %principal.id, "join rejected: no read access");
        return;
    }

    // The presence entry announces a user to the room; require the backing
    // record to still exist.
    match state.store().get_user(principal.id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::warn!(%conn_id, user_id = %principal.id, "join rejected: user not resolvable");
            return;
        }
        Err(err) => {
            tracing::warn!(%conn_id, error = %err, "join failed: user lookup");
            return;
        }
    }

    let Some(outcome) = state.presence().join(conn_id, list_id) else {
        tracing::warn!(%conn_id, "join ignored: connection not registered");
        return;
    };

    if let Some(previous) = &outcome.previous
        && !outcome.rejoined
    {
        tracing::debug!(%conn_id, left = %previous.list_id, joined = %list_id, "implicit leave on re-join");
        Broadcaster::fan_out(
            &outcome.departed_room,
            &ServerEvent::UserLeft {
                user_id: outcome.user_id,
                user_name: outcome.user_name.clone(),
            },
        );
    }

    if !outcome.rejoined {
        Broadcaster::fan_out(
            &outcome.peers,
            &ServerEvent::UserJoined {
                user_id: outcome.user_id,
                user_name: outcome.user_name.clone(),
            },
        );
    }

    if outcome
        .joiner
        .send(ServerEvent::ActiveUsers {
            users: outcome.snapshot,
        })
        .is_err()
    {
        tracing::debug!(%conn_id, "joiner disconnected before snapshot delivery");
    }
}

/// Leave the current room; remaining members learn `UserLeft`. A no-op for
/// a connection that isn't in a room.
pub fn leave(state: &AppState, conn_id: ConnectionId, raw_list_id: &str) {
    let Some(outcome) = state.presence().leave(conn_id) else {
        tracing::debug!(%conn_id, "leave ignored: not in a room");
        return;
    };

    // The registry is authoritative about which room the connection was in;
    // a stale list id in the request changes nothing.
    if ListId::parse(raw_list_id).ok() != Some(outcome.departure.list_id) {
        tracing::debug!(%conn_id, raw_list_id, actual = %outcome.departure.list_id, "leave request named a different list");
    }

    Broadcaster::fan_out(
        &outcome.remaining,
        &ServerEvent::UserLeft {
            user_id: outcome.departure.user_id,
            user_name: outcome.departure.user_name,
        },
    );
}

/// Transport-level disconnect: the same cleanup as an explicit leave, run
/// exactly once, plus dropping the registration. Racing an explicit leave
/// is safe - whichever runs second finds nothing to remove.
pub fn disconnect(state: &AppState, conn_id: ConnectionId) {
    if let Some(outcome) = state.presence().remove(conn_id) {
        Broadcaster::fan_out(
            &outcome.remaining,
            &ServerEvent::UserLeft {
                user_id: outcome.departure.user_id,
                user_name: outcome.departure.user_name,
            },
        );
    }
}

/// Drive one WebSocket for its whole life.
///
/// Messages from this connection are handled sequentially, so its registry
/// mutations and the notifications they trigger stay ordered relative to
/// each other.
pub async fn run(socket: WebSocket, state: AppState, principal: Principal) {
    // Provision the user row on first sight so later lookups resolve.
    if let Err(err) = state.store().ensure_user(&principal).await {
        tracing::error!(user_id = %principal.id, error = %err, "rejecting socket: user provisioning failed");
        return;
    }

    let (conn_id, mut events) = connect(&state, &principal);
    tracing::info!(%conn_id, user_id = %principal.id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Forward queued events to the peer; exits when the registry entry is
    // dropped or the peer goes away.
    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize server event");
                }
            }
        }
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(parsed) => handle_message(&state, conn_id, &principal, parsed).await,
                Err(err) => {
                    tracing::debug!(%conn_id, error = %err, "ignoring unparseable client message");
                }
            },
            Ok(Message::Close(_)) => break,
            // axum replies to pings itself; pongs and binary are ignored.
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(%conn_id, error = %err, "websocket error");
                break;
            }
        }
    }

    disconnect(&state, conn_id);
    send_task.abort();
    tracing::info!(%conn_id, user_id = %principal.id, "websocket disconnected");
}
