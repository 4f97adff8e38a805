//! In-memory [`Store`] implementation for tests.
//!
//! Mirrors the `PostgreSQL` store's semantics (cascading deletes, group
//! detach, single-use link claims) over mutex-guarded maps so the realtime
//! layer and services can be exercised without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use pantry_core::{GroupId, ItemId, ListId, Principal, UserId};

use crate::models::{GroceryItem, GroceryList, ItemGroup, ListShare, MagicLink, User};

use super::{RepositoryError, Store};

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    lists: HashMap<ListId, GroceryList>,
    shares: HashMap<(ListId, UserId), ListShare>,
    links: HashMap<String, MagicLink>,
    items: HashMap<ItemId, GroceryItem>,
    groups: HashMap<GroupId, ItemGroup>,
}

/// Map-backed store with the same observable behavior as `PgStore`.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn ensure_user(&self, principal: &Principal) -> Result<User, RepositoryError> {
        let mut inner = self.lock();
        let now = Utc::now();
        let user = inner
            .users
            .entry(principal.id)
            .and_modify(|u| {
                u.email.clone_from(&principal.email);
                u.name.clone_from(&principal.name);
                u.updated_at = now;
            })
            .or_insert_with(|| User {
                id: principal.id,
                email: principal.email.clone(),
                name: principal.name.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(user.clone())
    }

    async fn create_list(&self, list: &GroceryList) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.lists.contains_key(&list.id) {
            return Err(RepositoryError::Conflict("list already exists".to_owned()));
        }
        inner.lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn get_list(&self, id: ListId) -> Result<Option<GroceryList>, RepositoryError> {
        Ok(self.lock().lists.get(&id).cloned())
    }

    async fn lists_for_user(&self, user_id: UserId) -> Result<Vec<GroceryList>, RepositoryError> {
        let inner = self.lock();
        let mut lists: Vec<GroceryList> = inner
            .lists
            .values()
            .filter(|l| {
                l.owner_id == user_id || inner.shares.contains_key(&(l.id, user_id))
            })
            .cloned()
            .collect();
        lists.sort_by_key(|l| l.created_at);
        Ok(lists)
    }

    async fn update_list(&self, list: &GroceryList) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if !inner.lists.contains_key(&list.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn delete_list(&self, id: ListId) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        if inner.lists.remove(&id).is_none() {
            return Ok(false);
        }
        inner.items.retain(|_, item| item.list_id != id);
        inner.groups.retain(|_, group| group.list_id != id);
        inner.shares.retain(|(list_id, _), _| *list_id != id);
        inner.links.retain(|_, link| link.list_id != id);
        Ok(true)
    }

    async fn shares_for_list(&self, list_id: ListId) -> Result<Vec<ListShare>, RepositoryError> {
        let inner = self.lock();
        let mut shares: Vec<ListShare> = inner
            .shares
            .values()
            .filter(|s| s.list_id == list_id)
            .cloned()
            .collect();
        shares.sort_by_key(|s| s.created_at);
        Ok(shares)
    }

    async fn create_share(&self, share: &ListShare) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        let key = (share.list_id, share.shared_with_user_id);
        if inner.shares.contains_key(&key) {
            return Err(RepositoryError::Conflict(
                "list already shared with this user".to_owned(),
            ));
        }
        inner.shares.insert(key, share.clone());
        Ok(())
    }

    async fn update_share(
        &self,
        list_id: ListId,
        user_id: UserId,
        can_edit: bool,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        match inner.shares.get_mut(&(list_id, user_id)) {
            Some(share) => {
                share.can_edit = can_edit;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_share(
        &self,
        list_id: ListId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(self.lock().shares.remove(&(list_id, user_id)).is_some())
    }

    async fn create_magic_link(&self, link: &MagicLink) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.links.contains_key(&link.token) {
            return Err(RepositoryError::Conflict("token collision".to_owned()));
        }
        inner.links.insert(link.token.clone(), link.clone());
        Ok(())
    }

    async fn claim_magic_link(
        &self,
        token: &str,
        claimer: UserId,
    ) -> Result<Option<MagicLink>, RepositoryError> {
        let mut inner = self.lock();

        let Some(link) = inner.links.get_mut(token) else {
            return Ok(None);
        };
        if link.claimed_by.is_some() {
            return Ok(None);
        }
        link.claimed_by = Some(claimer);
        let link = link.clone();

        let owner = inner.lists.get(&link.list_id).map(|l| l.owner_id);
        if owner != Some(claimer) {
            // Upsert: claiming a second link for the same list adjusts the
            // existing grant rather than failing.
            let share = ListShare {
                list_id: link.list_id,
                shared_with_user_id: claimer,
                can_edit: link.can_edit,
                created_at: Utc::now(),
            };
            inner
                .shares
                .entry((link.list_id, claimer))
                .and_modify(|s| s.can_edit = link.can_edit)
                .or_insert(share);
        }

        Ok(Some(link))
    }

    async fn create_item(&self, item: &GroceryItem) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.items.contains_key(&item.id) {
            return Err(RepositoryError::Conflict("item already exists".to_owned()));
        }
        inner.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<GroceryItem>, RepositoryError> {
        Ok(self.lock().items.get(&id).cloned())
    }

    async fn items_for_list(
        &self,
        list_id: ListId,
    ) -> Result<Vec<GroceryItem>, RepositoryError> {
        let inner = self.lock();
        let mut items: Vec<GroceryItem> = inner
            .items
            .values()
            .filter(|i| i.list_id == list_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.created_at);
        Ok(items)
    }

    async fn update_item(&self, item: &GroceryItem) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if !inner.items.contains_key(&item.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_item(&self, id: ItemId) -> Result<bool, RepositoryError> {
        Ok(self.lock().items.remove(&id).is_some())
    }

    async fn create_group(&self, group: &ItemGroup) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.groups.contains_key(&group.id) {
            return Err(RepositoryError::Conflict("group already exists".to_owned()));
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<ItemGroup>, RepositoryError> {
        Ok(self.lock().groups.get(&id).cloned())
    }

    async fn groups_for_list(
        &self,
        list_id: ListId,
    ) -> Result<Vec<ItemGroup>, RepositoryError> {
        let inner = self.lock();
        let mut groups: Vec<ItemGroup> = inner
            .groups
            .values()
            .filter(|g| g.list_id == list_id)
            .cloned()
            .collect();
        groups.sort_by_key(|g| (g.sort_order, g.created_at));
        Ok(groups)
    }

    async fn update_group(&self, group: &ItemGroup) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if !inner.groups.contains_key(&group.id) {
            return Err(RepositoryError::NotFound);
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool, RepositoryError> {
        let mut inner = self.lock();
        if inner.groups.remove(&id).is_none() {
            return Ok(false);
        }
        for item in inner.items.values_mut() {
            if item.group_id == Some(id) {
                item.group_id = None;
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::new(
            UserId::generate(),
            "ada@example.com".to_owned(),
            "Ada".to_owned(),
        )
    }

    fn list_owned_by(owner: UserId) -> GroceryList {
        let now = Utc::now();
        GroceryList {
            id: ListId::generate(),
            owner_id: owner,
            name: "Weekly shop".to_owned(),
            description: None,
            auto_remove_after_secs: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_ensure_user_is_idempotent_and_tracks_renames() {
        let store = MemoryStore::new();
        let mut p = principal();

        let first = store.ensure_user(&p).await.expect("provision");
        p.name = "Ada L.".to_owned();
        let second = store.ensure_user(&p).await.expect("re-provision");

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Ada L.");
    }

    #[tokio::test]
    async fn test_magic_link_is_single_use() {
        let store = MemoryStore::new();
        let owner = UserId::generate();
        let list = list_owned_by(owner);
        store.create_list(&list).await.expect("list");

        let link = MagicLink {
            token: "tok".to_owned(),
            list_id: list.id,
            can_edit: true,
            claimed_by: None,
            created_at: Utc::now(),
        };
        store.create_magic_link(&link).await.expect("link");

        let claimer = UserId::generate();
        let claimed = store
            .claim_magic_link("tok", claimer)
            .await
            .expect("claim")
            .expect("first claim succeeds");
        assert_eq!(claimed.list_id, list.id);
        assert_eq!(
            store.shares_for_list(list.id).await.expect("shares").len(),
            1
        );

        // Second claim, even by another user, finds the link consumed.
        assert!(
            store
                .claim_magic_link("tok", UserId::generate())
                .await
                .expect("claim")
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_owner_claiming_their_own_link_creates_no_share() {
        let store = MemoryStore::new();
        let owner = UserId::generate();
        let list = list_owned_by(owner);
        store.create_list(&list).await.expect("list");
        store
            .create_magic_link(&MagicLink {
                token: "own".to_owned(),
                list_id: list.id,
                can_edit: false,
                claimed_by: None,
                created_at: Utc::now(),
            })
            .await
            .expect("link");

        assert!(
            store
                .claim_magic_link("own", owner)
                .await
                .expect("claim")
                .is_some()
        );
        assert!(store.shares_for_list(list.id).await.expect("shares").is_empty());
    }

    #[tokio::test]
    async fn test_delete_list_cascades() {
        let store = MemoryStore::new();
        let owner = UserId::generate();
        let list = list_owned_by(owner);
        store.create_list(&list).await.expect("list");

        let now = Utc::now();
        let item = GroceryItem {
            id: ItemId::generate(),
            list_id: list.id,
            group_id: None,
            name: "Milk".to_owned(),
            note: None,
            quantity: None,
            is_bought: false,
            bought_at: None,
            created_at: now,
            updated_at: now,
        };
        store.create_item(&item).await.expect("item");
        store
            .create_share(&ListShare {
                list_id: list.id,
                shared_with_user_id: UserId::generate(),
                can_edit: false,
                created_at: now,
            })
            .await
            .expect("share");

        assert!(store.delete_list(list.id).await.expect("delete"));
        assert!(store.get_item(item.id).await.expect("get").is_none());
        assert!(store.shares_for_list(list.id).await.expect("shares").is_empty());
        // Idempotent: the second delete reports nothing removed.
        assert!(!store.delete_list(list.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn test_delete_group_detaches_items() {
        let store = MemoryStore::new();
        let list = list_owned_by(UserId::generate());
        store.create_list(&list).await.expect("list");

        let now = Utc::now();
        let group = ItemGroup {
            id: GroupId::generate(),
            list_id: list.id,
            name: "Produce".to_owned(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
        };
        store.create_group(&group).await.expect("group");

        let item = GroceryItem {
            id: ItemId::generate(),
            list_id: list.id,
            group_id: Some(group.id),
            name: "Apples".to_owned(),
            note: None,
            quantity: Some(6),
            is_bought: false,
            bought_at: None,
            created_at: now,
            updated_at: now,
        };
        store.create_item(&item).await.expect("item");

        assert!(store.delete_group(group.id).await.expect("delete"));
        let survivor = store
            .get_item(item.id)
            .await
            .expect("get")
            .expect("item stays on the list");
        assert_eq!(survivor.group_id, None);
    }

    #[tokio::test]
    async fn test_groups_order_by_sort_order_then_insertion() {
        let store = MemoryStore::new();
        let list = list_owned_by(UserId::generate());
        store.create_list(&list).await.expect("list");

        for (name, sort_order, offset_ms) in
            [("Dairy", 1, 0), ("Produce", 0, 1), ("Frozen", 1, 2)]
        {
            let at = Utc::now() + chrono::Duration::milliseconds(offset_ms);
            store
                .create_group(&ItemGroup {
                    id: GroupId::generate(),
                    list_id: list.id,
                    name: name.to_owned(),
                    sort_order,
                    created_at: at,
                    updated_at: at,
                })
                .await
                .expect("group");
        }

        let names: Vec<String> = store
            .groups_for_list(list.id)
            .await
            .expect("groups")
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, ["Produce", "Dairy", "Frozen"]);
    }
}
