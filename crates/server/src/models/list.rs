//! List, share, and magic-link domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pantry_core::{ListId, UserId};

/// A grocery list (domain type).
///
/// Exactly one owner; non-owners gain access through a [`ListShare`].
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GroceryList {
    /// Unique list ID.
    pub id: ListId,
    /// User who created the list; the only principal allowed to delete it
    /// or manage its shares.
    pub owner_id: UserId,
    /// Display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Default delay after which a bought item is removed automatically,
    /// in seconds. `None` disables auto-removal for this list.
    pub auto_remove_after_secs: Option<i64>,
    /// When the list was created.
    pub created_at: DateTime<Utc>,
    /// When the list was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A share grant: lets a non-owner read (and optionally edit) one list.
///
/// Unique per `(list_id, shared_with_user_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ListShare {
    /// The shared list.
    pub list_id: ListId,
    /// The recipient of the grant.
    pub shared_with_user_id: UserId,
    /// Whether the recipient may mutate the list (items, groups).
    pub can_edit: bool,
    /// When the share was created.
    pub created_at: DateTime<Utc>,
}

/// A redeemable share token ("magic link").
///
/// Claimed at most once by an authenticated user, creating a [`ListShare`]
/// without the owner knowing the recipient up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MagicLink {
    /// URL-safe random token; the link's identity.
    pub token: String,
    /// List the link grants access to.
    pub list_id: ListId,
    /// Edit capability carried by the resulting share.
    pub can_edit: bool,
    /// Who claimed the link, once claimed.
    pub claimed_by: Option<UserId>,
    /// When the link was generated.
    pub created_at: DateTime<Utc>,
}
