//! `PostgreSQL` [`Store`] implementation.
//!
//! Runtime-checked sqlx queries mapping onto the domain types via
//! `FromRow`. Cascades (list -> items/groups/shares/links) and group
//! detachment live in the schema's foreign keys; see
//! `migrations/0001_init.sql`.

use async_trait::async_trait;
use sqlx::PgPool;

use pantry_core::{GroupId, ItemId, ListId, Principal, UserId};

use crate::models::{GroceryItem, GroceryList, ItemGroup, ListShare, MagicLink, User};

use super::{RepositoryError, Store};

/// Store backed by the `pantry` schema.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn conflict_or_db(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at
            FROM pantry."user"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn ensure_user(&self, principal: &Principal) -> Result<User, RepositoryError> {
        let upsert = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO pantry."user" (id, email, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET email = EXCLUDED.email, name = EXCLUDED.name, updated_at = now()
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(principal.id)
        .bind(&principal.email)
        .bind(&principal.name)
        .fetch_one(&self.pool)
        .await;

        match upsert {
            Ok(user) => Ok(user),
            Err(err) => {
                // Two first requests can race on the email uniqueness
                // constraint; the row exists by now, so re-read it once.
                if let sqlx::Error::Database(ref db_err) = err
                    && db_err.is_unique_violation()
                {
                    return self
                        .get_user(principal.id)
                        .await?
                        .ok_or_else(|| conflict_or_db(err, "email already in use"));
                }
                Err(RepositoryError::Database(err))
            }
        }
    }

    async fn create_list(&self, list: &GroceryList) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO pantry.grocery_list
                (id, owner_id, name, description, auto_remove_after_secs, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(list.id)
        .bind(list.owner_id)
        .bind(&list.name)
        .bind(&list.description)
        .bind(list.auto_remove_after_secs)
        .bind(list.created_at)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "list already exists"))?;
        Ok(())
    }

    async fn get_list(&self, id: ListId) -> Result<Option<GroceryList>, RepositoryError> {
        let list = sqlx::query_as::<_, GroceryList>(
            r#"
            SELECT id, owner_id, name, description, auto_remove_after_secs,
                   created_at, updated_at
            FROM pantry.grocery_list
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(list)
    }

    async fn lists_for_user(&self, user_id: UserId) -> Result<Vec<GroceryList>, RepositoryError> {
        let lists = sqlx::query_as::<_, GroceryList>(
            r#"
            SELECT l.id, l.owner_id, l.name, l.description, l.auto_remove_after_secs,
                   l.created_at, l.updated_at
            FROM pantry.grocery_list l
            WHERE l.owner_id = $1
               OR EXISTS (
                      SELECT 1 FROM pantry.list_share s
                      WHERE s.list_id = l.id AND s.shared_with_user_id = $1
                  )
            ORDER BY l.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lists)
    }

    async fn update_list(&self, list: &GroceryList) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pantry.grocery_list
            SET name = $2, description = $3, auto_remove_after_secs = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(list.id)
        .bind(&list.name)
        .bind(&list.description)
        .bind(list.auto_remove_after_secs)
        .bind(list.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_list(&self, id: ListId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pantry.grocery_list WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn shares_for_list(&self, list_id: ListId) -> Result<Vec<ListShare>, RepositoryError> {
        let shares = sqlx::query_as::<_, ListShare>(
            r#"
            SELECT list_id, shared_with_user_id, can_edit, created_at
            FROM pantry.list_share
            WHERE list_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shares)
    }

    async fn create_share(&self, share: &ListShare) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO pantry.list_share (list_id, shared_with_user_id, can_edit, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(share.list_id)
        .bind(share.shared_with_user_id)
        .bind(share.can_edit)
        .bind(share.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "list already shared with this user"))?;
        Ok(())
    }

    async fn update_share(
        &self,
        list_id: ListId,
        user_id: UserId,
        can_edit: bool,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pantry.list_share
            SET can_edit = $3
            WHERE list_id = $1 AND shared_with_user_id = $2
            "#,
        )
        .bind(list_id)
        .bind(user_id)
        .bind(can_edit)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_share(
        &self,
        list_id: ListId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            DELETE FROM pantry.list_share
            WHERE list_id = $1 AND shared_with_user_id = $2
            "#,
        )
        .bind(list_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_magic_link(&self, link: &MagicLink) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO pantry.magic_link (token, list_id, can_edit, claimed_by, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&link.token)
        .bind(link.list_id)
        .bind(link.can_edit)
        .bind(link.claimed_by)
        .bind(link.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "token collision"))?;
        Ok(())
    }

    async fn claim_magic_link(
        &self,
        token: &str,
        claimer: UserId,
    ) -> Result<Option<MagicLink>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Single-use: only an unclaimed row can be claimed, atomically.
        let link = sqlx::query_as::<_, MagicLink>(
            r#"
            UPDATE pantry.magic_link
            SET claimed_by = $2
            WHERE token = $1 AND claimed_by IS NULL
            RETURNING token, list_id, can_edit, claimed_by, created_at
            "#,
        )
        .bind(token)
        .bind(claimer)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(link) = link else {
            return Ok(None);
        };

        let owner: Option<UserId> =
            sqlx::query_scalar("SELECT owner_id FROM pantry.grocery_list WHERE id = $1")
                .bind(link.list_id)
                .fetch_optional(&mut *tx)
                .await?;

        if owner != Some(claimer) {
            sqlx::query(
                r#"
                INSERT INTO pantry.list_share (list_id, shared_with_user_id, can_edit)
                VALUES ($1, $2, $3)
                ON CONFLICT (list_id, shared_with_user_id)
                DO UPDATE SET can_edit = EXCLUDED.can_edit
                "#,
            )
            .bind(link.list_id)
            .bind(claimer)
            .bind(link.can_edit)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(link))
    }

    async fn create_item(&self, item: &GroceryItem) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO pantry.grocery_item
                (id, list_id, group_id, name, note, quantity, is_bought, bought_at,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(item.id)
        .bind(item.list_id)
        .bind(item.group_id)
        .bind(&item.name)
        .bind(&item.note)
        .bind(item.quantity)
        .bind(item.is_bought)
        .bind(item.bought_at)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "item already exists"))?;
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<GroceryItem>, RepositoryError> {
        let item = sqlx::query_as::<_, GroceryItem>(
            r#"
            SELECT id, list_id, group_id, name, note, quantity, is_bought, bought_at,
                   created_at, updated_at
            FROM pantry.grocery_item
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn items_for_list(
        &self,
        list_id: ListId,
    ) -> Result<Vec<GroceryItem>, RepositoryError> {
        let items = sqlx::query_as::<_, GroceryItem>(
            r#"
            SELECT id, list_id, group_id, name, note, quantity, is_bought, bought_at,
                   created_at, updated_at
            FROM pantry.grocery_item
            WHERE list_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn update_item(&self, item: &GroceryItem) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pantry.grocery_item
            SET group_id = $2, name = $3, note = $4, quantity = $5,
                is_bought = $6, bought_at = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.group_id)
        .bind(&item.name)
        .bind(&item.note)
        .bind(item.quantity)
        .bind(item.is_bought)
        .bind(item.bought_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM pantry.grocery_item WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_group(&self, group: &ItemGroup) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO pantry.item_group (id, list_id, name, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(group.id)
        .bind(group.list_id)
        .bind(&group.name)
        .bind(group.sort_order)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or_db(e, "group already exists"))?;
        Ok(())
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<ItemGroup>, RepositoryError> {
        let group = sqlx::query_as::<_, ItemGroup>(
            r#"
            SELECT id, list_id, name, sort_order, created_at, updated_at
            FROM pantry.item_group
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn groups_for_list(
        &self,
        list_id: ListId,
    ) -> Result<Vec<ItemGroup>, RepositoryError> {
        let groups = sqlx::query_as::<_, ItemGroup>(
            r#"
            SELECT id, list_id, name, sort_order, created_at, updated_at
            FROM pantry.item_group
            WHERE list_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(list_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn update_group(&self, group: &ItemGroup) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE pantry.item_group
            SET name = $2, sort_order = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.sort_order)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool, RepositoryError> {
        // FK on grocery_item.group_id is ON DELETE SET NULL: items stay on
        // the list, detached.
        let result = sqlx::query("DELETE FROM pantry.item_group WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
