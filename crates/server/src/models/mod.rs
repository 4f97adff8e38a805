//! Domain types for lists, items, groups, shares, and users.
//!
//! These are validated domain objects; database rows map onto them via
//! `sqlx::FromRow`, and the realtime protocol serializes them directly.

pub mod item;
pub mod list;
pub mod user;

pub use item::{GroceryItem, ItemGroup};
pub use list::{GroceryList, ListShare, MagicLink};
pub use user::User;
