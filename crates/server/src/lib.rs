//! Pantry Server - Shared grocery-list backend.
//!
//! # Architecture
//!
//! - Axum web framework serving a JSON API plus one WebSocket endpoint
//! - `PostgreSQL` (via sqlx) as the system of record for lists, items,
//!   groups, shares, and users
//! - In-memory presence registry + broadcaster for live collaboration;
//!   clients re-fetch state after reconnect rather than relying on replay
//! - Bearer JWT authentication; the server consumes verified principals
//!   and never handles raw credentials beyond signature validation
//!
//! # Modules
//!
//! - [`policy`] - Pure access decisions (owner / shared-viewer / shared-editor)
//! - [`realtime`] - Presence registry, session hub, and mutation broadcaster
//! - [`services`] - Mutation logic gating every write behind the policy
//! - [`db`] - The `Store` seam and its `PostgreSQL` implementation
//! - [`routes`] - Thin HTTP adapters over the service layer

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;
