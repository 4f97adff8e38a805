//! Integration tests for the pantry backend.
//!
//! Tests run against the real router and service layer with the in-memory
//! [`MemoryStore`] standing in for `PostgreSQL`, so no database or network
//! is needed. Realtime scenarios drive the hub functions directly with
//! channel-backed connections, the same seam the WebSocket task uses.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tower::ServiceExt;

use pantry_core::{ConnectionId, Principal, UserId};
use pantry_server::config::ServerConfig;
use pantry_server::db::memory::MemoryStore;
use pantry_server::middleware::auth::issue_token;
use pantry_server::realtime::{ServerEvent, hub};
use pantry_server::routes;
use pantry_server::state::AppState;

/// One backend instance wired to an in-memory store.
pub struct TestContext {
    pub state: AppState,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://unused"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            jwt_secret: SecretString::from("correct-horse-battery-staple-0123456789ab"),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()));
        Self { state }
    }

    /// The full HTTP surface, as `main` assembles it (minus middleware
    /// layers that need a live transport).
    #[must_use]
    pub fn app(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::ws_routes())
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
    }

    #[must_use]
    pub fn token(&self, principal: &Principal) -> String {
        issue_token(principal, &self.state.config().jwt_secret, 3600)
    }

    /// Create the principal's user row, as the first authenticated request
    /// would.
    pub async fn provision(&self, principal: &Principal) {
        self.state
            .store()
            .ensure_user(principal)
            .await
            .expect("provision user");
    }

    /// Send one JSON request through the router and decode the response.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        principal: Option<&Principal>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(principal) = principal {
            request = request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token(principal)),
            );
        }
        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("build request");

        let response = self.app().oneshot(request).await.expect("send request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Open a channel-backed realtime connection for `principal`.
    #[must_use]
    pub fn connect(
        &self,
        principal: &Principal,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        hub::connect(&self.state, principal)
    }
}

/// A fresh principal with a unique id and a derived email address.
#[must_use]
pub fn principal(name: &str) -> Principal {
    let id = UserId::generate();
    Principal::new(id, format!("{}@example.com", name.to_lowercase()), name.to_owned())
}

/// Everything currently queued on a connection's event channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
