//! User domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pantry_core::UserId;

/// A provisioned user (domain type).
///
/// Rows are created lazily the first time a verified principal touches the
/// system; identity itself lives with the external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    /// Stable user ID, matching the identity provider's subject.
    pub id: UserId,
    /// Email address (unique).
    pub email: String,
    /// Display name shown to collaborators.
    pub name: String,
    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
    /// When the user record was last updated.
    pub updated_at: DateTime<Utc>,
}
