//! Pantry Core - Shared types library.
//!
//! This crate provides common types used across all Pantry components:
//! - `server` - Shared grocery-list API and realtime backend
//! - `integration-tests` - End-to-end scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and the authenticated principal

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
