//! Database operations for the Pantry `PostgreSQL` database.
//!
//! # Tables (schema `pantry`)
//!
//! - `user` - Lazily provisioned principals
//! - `grocery_list` - Lists, one owner each
//! - `list_share` - Per-user read/edit grants
//! - `magic_link` - Single-use redeemable share tokens
//! - `item_group` - Named display groups within a list
//! - `grocery_item` - The items themselves
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via
//! `sqlx migrate run` (or [`run_migrations`] at startup).
//!
//! The [`Store`] trait is the seam between the application and storage:
//! production wires [`postgres::PgStore`], tests wire the in-memory store
//! behind the `test-utils` feature.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use pantry_core::{GroupId, ItemId, ListId, Principal, UserId};

use crate::models::{GroceryItem, GroceryList, ItemGroup, ListShare, MagicLink, User};

pub mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate share).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply pending migrations from `crates/server/migrations/`.
///
/// # Errors
///
/// Returns the migration error if any step fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Persistence seam consumed by services and the realtime hub.
///
/// Reads are point-in-time; access decisions are recomputed from fresh
/// `get_list` + `shares_for_list` reads on every sensitive call.
#[async_trait]
pub trait Store: Send + Sync {
    /// Readiness check against the backing storage.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // --- users -----------------------------------------------------------

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Provision the principal's row on first sight, updating email/name
    /// drift on later sights. Implementations must absorb the
    /// unique-constraint race of two first requests arriving at once by
    /// re-reading the row that the other writer created.
    async fn ensure_user(&self, principal: &Principal) -> Result<User, RepositoryError>;

    // --- lists -----------------------------------------------------------

    async fn create_list(&self, list: &GroceryList) -> Result<(), RepositoryError>;

    async fn get_list(&self, id: ListId) -> Result<Option<GroceryList>, RepositoryError>;

    /// Lists the user owns plus lists shared with them.
    async fn lists_for_user(&self, user_id: UserId) -> Result<Vec<GroceryList>, RepositoryError>;

    /// Full-row write; concurrent edits are last-writer-wins.
    async fn update_list(&self, list: &GroceryList) -> Result<(), RepositoryError>;

    /// Cascades to items, groups, shares, and magic links. Returns whether
    /// a row was deleted.
    async fn delete_list(&self, id: ListId) -> Result<bool, RepositoryError>;

    // --- shares ----------------------------------------------------------

    async fn shares_for_list(&self, list_id: ListId) -> Result<Vec<ListShare>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] if the pair already exists.
    async fn create_share(&self, share: &ListShare) -> Result<(), RepositoryError>;

    /// Returns whether the share existed.
    async fn update_share(
        &self,
        list_id: ListId,
        user_id: UserId,
        can_edit: bool,
    ) -> Result<bool, RepositoryError>;

    /// Returns whether the share existed.
    async fn delete_share(&self, list_id: ListId, user_id: UserId)
    -> Result<bool, RepositoryError>;

    // --- magic links -----------------------------------------------------

    async fn create_magic_link(&self, link: &MagicLink) -> Result<(), RepositoryError>;

    /// Atomically claim an unclaimed link: marks it claimed and creates (or
    /// upgrades) the share in one transaction. Returns `None` if the token
    /// is unknown or already claimed. Claiming a list you own consumes the
    /// link without creating a share.
    async fn claim_magic_link(
        &self,
        token: &str,
        claimer: UserId,
    ) -> Result<Option<MagicLink>, RepositoryError>;

    // --- items -----------------------------------------------------------

    async fn create_item(&self, item: &GroceryItem) -> Result<(), RepositoryError>;

    async fn get_item(&self, id: ItemId) -> Result<Option<GroceryItem>, RepositoryError>;

    async fn items_for_list(&self, list_id: ListId) -> Result<Vec<GroceryItem>, RepositoryError>;

    /// Full-row write; concurrent edits are last-writer-wins.
    async fn update_item(&self, item: &GroceryItem) -> Result<(), RepositoryError>;

    /// Returns whether a row was deleted.
    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError>;

    // --- groups ----------------------------------------------------------

    async fn create_group(&self, group: &ItemGroup) -> Result<(), RepositoryError>;

    async fn get_group(&self, id: GroupId) -> Result<Option<ItemGroup>, RepositoryError>;

    /// Ordered by `sort_order`, ties broken by insertion order.
    async fn groups_for_list(&self, list_id: ListId) -> Result<Vec<ItemGroup>, RepositoryError>;

    async fn update_group(&self, group: &ItemGroup) -> Result<(), RepositoryError>;

    /// Detaches the group's items (they stay on the list) and deletes the
    /// group. Returns whether a row was deleted.
    async fn delete_group(&self, id: GroupId) -> Result<bool, RepositoryError>;
}
