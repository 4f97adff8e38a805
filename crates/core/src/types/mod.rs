//! Core types for Pantry.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod principal;

pub use id::*;
pub use principal::Principal;
