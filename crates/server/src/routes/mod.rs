//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                  - Liveness probe
//! GET    /health/ready                            - Readiness probe (pings the database)
//! GET    /ws?access_token=...                     - Realtime WebSocket
//!
//! # All /api routes require a bearer token
//! GET    /api/me                                  - Current user profile
//!
//! # Lists
//! GET    /api/lists                               - Lists owned by or shared with the caller
//! POST   /api/lists                               - Create a list
//! GET    /api/lists/{list_id}                     - List with its groups and items
//! PUT    /api/lists/{list_id}                     - Update list metadata
//! DELETE /api/lists/{list_id}                     - Delete a list (owner only)
//!
//! # Items
//! POST   /api/lists/{list_id}/items               - Add an item
//! PUT    /api/lists/{list_id}/items/{item_id}     - Update an item
//! PUT    /api/lists/{list_id}/items/{item_id}/bought - Set the bought flag
//! DELETE /api/lists/{list_id}/items/{item_id}     - Remove an item
//!
//! # Groups
//! POST   /api/lists/{list_id}/groups              - Create a group
//! PUT    /api/lists/{list_id}/groups/{group_id}   - Update a group
//! DELETE /api/lists/{list_id}/groups/{group_id}   - Delete a group (items are detached)
//!
//! # Sharing (owner only, except claim)
//! GET    /api/lists/{list_id}/shares              - List shares
//! POST   /api/lists/{list_id}/shares              - Share with a user
//! PUT    /api/lists/{list_id}/shares/{user_id}    - Change a share's permission
//! DELETE /api/lists/{list_id}/shares/{user_id}    - Revoke a share
//! POST   /api/lists/{list_id}/magic-links         - Mint a single-use invite link
//! POST   /api/magic-links/{token}/claim           - Redeem an invite link
//! ```

pub mod groups;
pub mod health;
pub mod items;
pub mod lists;
pub mod shares;
pub mod users;
pub mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the JSON API router, mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(users::me))
        .route("/lists", get(lists::index).post(lists::create))
        .route(
            "/lists/{list_id}",
            get(lists::show).put(lists::update).delete(lists::destroy),
        )
        .route("/lists/{list_id}/items", post(items::create))
        .route(
            "/lists/{list_id}/items/{item_id}",
            put(items::update).delete(items::destroy),
        )
        .route(
            "/lists/{list_id}/items/{item_id}/bought",
            put(items::set_bought),
        )
        .route("/lists/{list_id}/groups", post(groups::create))
        .route(
            "/lists/{list_id}/groups/{group_id}",
            put(groups::update).delete(groups::destroy),
        )
        .route(
            "/lists/{list_id}/shares",
            get(shares::index).post(shares::create),
        )
        .route(
            "/lists/{list_id}/shares/{user_id}",
            put(shares::update).delete(shares::destroy),
        )
        .route("/lists/{list_id}/magic-links", post(shares::create_link))
        .route("/magic-links/{token}/claim", post(shares::claim_link))
}

/// Create the health probe router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}

/// Create the WebSocket router.
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws::upgrade))
}
