//! The authenticated identity attached to every request and connection.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A verified principal, resolved by the transport layer before any
/// application logic runs.
///
/// The server never parses raw credentials itself - by the time a
/// `Principal` exists, the bearer token has already been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user ID.
    pub id: UserId,
    /// Email address as asserted by the identity provider.
    pub email: String,
    /// Display name shown to collaborators.
    pub name: String,
}

impl Principal {
    /// Create a principal from verified claim values.
    #[must_use]
    pub const fn new(id: UserId, email: String, name: String) -> Self {
        Self { id, email, name }
    }
}
