//! Item and item-group domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use pantry_core::{GroupId, ItemId, ListId};

/// A single grocery item on a list.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GroceryItem {
    /// Unique item ID.
    pub id: ItemId,
    /// The list this item belongs to.
    pub list_id: ListId,
    /// Optional group within the same list.
    pub group_id: Option<GroupId>,
    /// Display name (e.g., "Milk").
    pub name: String,
    /// Optional free-form note.
    pub note: Option<String>,
    /// Optional quantity.
    pub quantity: Option<i32>,
    /// Whether the item has been bought.
    pub is_bought: bool,
    /// Set when `is_bought` flips to true, cleared when it flips to false.
    /// Always consistent with the flag.
    pub bought_at: Option<DateTime<Utc>>,
    /// When the item was added.
    pub created_at: DateTime<Utc>,
    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A named group of items within one list, ordered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ItemGroup {
    /// Unique group ID.
    pub id: GroupId,
    /// The list this group belongs to.
    pub list_id: ListId,
    /// Display name (e.g., "Produce").
    pub name: String,
    /// Display position; ties broken by insertion order.
    pub sort_order: i32,
    /// When the group was created.
    pub created_at: DateTime<Utc>,
    /// When the group was last updated.
    pub updated_at: DateTime<Utc>,
}
