//! Item mutations. Every successful write is announced to the list's room
//! through the broadcaster; flipping an item to bought may also arm the
//! auto-removal timer when the list opts in.

use chrono::Utc;
use pantry_core::{GroupId, ItemId, ListId, Principal};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{GroceryItem, GroceryList};
use crate::realtime::ServerEvent;
use crate::state::AppState;

use super::{authorize_edit, autoremove};

#[derive(Debug, Deserialize)]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Deserialize)]
pub struct BoughtInput {
    pub is_bought: bool,
}

fn validate_input(input: &ItemInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("item name must not be empty".to_owned()));
    }
    if input.quantity.is_some_and(|q| q <= 0) {
        return Err(AppError::BadRequest("quantity must be positive".to_owned()));
    }
    Ok(())
}

/// A group assignment must point at a group on the same list.
async fn validate_group(
    state: &AppState,
    list_id: ListId,
    group_id: Option<GroupId>,
) -> Result<()> {
    let Some(group_id) = group_id else {
        return Ok(());
    };
    let group = state
        .store()
        .get_group(group_id)
        .await?
        .filter(|g| g.list_id == list_id);
    if group.is_none() {
        return Err(AppError::BadRequest(format!(
            "group {group_id} does not belong to this list"
        )));
    }
    Ok(())
}

pub async fn add_item(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    input: ItemInput,
) -> Result<GroceryItem> {
    validate_input(&input)?;
    authorize_edit(state, principal.id, list_id).await?;
    validate_group(state, list_id, input.group_id).await?;

    let now = Utc::now();
    let item = GroceryItem {
        id: ItemId::generate(),
        list_id,
        group_id: input.group_id,
        name: input.name,
        note: input.note,
        quantity: input.quantity,
        is_bought: false,
        bought_at: None,
        created_at: now,
        updated_at: now,
    };
    state.store().create_item(&item).await?;

    state
        .broadcaster()
        .broadcast(list_id, &ServerEvent::ItemAdded { item: item.clone() });
    Ok(item)
}

pub async fn update_item(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    item_id: ItemId,
    input: ItemInput,
) -> Result<GroceryItem> {
    validate_input(&input)?;
    authorize_edit(state, principal.id, list_id).await?;
    let mut item = load_item(state, list_id, item_id).await?;
    validate_group(state, list_id, input.group_id).await?;

    item.name = input.name;
    item.note = input.note;
    item.quantity = input.quantity;
    item.group_id = input.group_id;
    item.updated_at = Utc::now();
    state.store().update_item(&item).await?;

    state
        .broadcaster()
        .broadcast(list_id, &ServerEvent::ItemUpdated { item: item.clone() });
    Ok(item)
}

/// Flip an item's bought flag. The `bought_at` timestamp is set in the same
/// write and doubles as the auto-removal epoch: a later un-bought/re-bought
/// cycle produces a new epoch, which invalidates any timer armed for the
/// old one.
pub async fn set_bought(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    item_id: ItemId,
    input: BoughtInput,
) -> Result<GroceryItem> {
    let list = authorize_edit(state, principal.id, list_id).await?;
    let mut item = load_item(state, list_id, item_id).await?;

    if item.is_bought == input.is_bought {
        // Idempotent repeat; don't disturb the epoch or wake the room.
        return Ok(item);
    }

    let now = Utc::now();
    item.is_bought = input.is_bought;
    item.bought_at = input.is_bought.then_some(now);
    item.updated_at = now;
    state.store().update_item(&item).await?;

    state.broadcaster().broadcast(
        list_id,
        &ServerEvent::ItemBoughtStatusChanged {
            id: item.id,
            is_bought: item.is_bought,
            bought_at: item.bought_at,
            updated_at: item.updated_at,
        },
    );

    if item.is_bought {
        arm_autoremove(state, &list, &item);
    }
    Ok(item)
}

pub async fn remove_item(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    item_id: ItemId,
) -> Result<()> {
    authorize_edit(state, principal.id, list_id).await?;
    let item = load_item(state, list_id, item_id).await?;

    state.store().delete_item(item.id).await?;
    state
        .broadcaster()
        .broadcast(list_id, &ServerEvent::ItemRemoved { id: item.id });
    Ok(())
}

/// Items are addressed under their list, so a valid item id paired with the
/// wrong list is treated as absent.
async fn load_item(state: &AppState, list_id: ListId, item_id: ItemId) -> Result<GroceryItem> {
    state
        .store()
        .get_item(item_id)
        .await?
        .filter(|item| item.list_id == list_id)
        .ok_or_else(|| AppError::NotFound(format!("item {item_id}")))
}

fn arm_autoremove(state: &AppState, list: &GroceryList, item: &GroceryItem) {
    let (Some(secs), Some(epoch)) = (list.auto_remove_after_secs, item.bought_at) else {
        return;
    };
    autoremove::schedule(
        state.clone(),
        list.id,
        item.id,
        std::time::Duration::from_secs(secs.unsigned_abs()),
        epoch,
    );
}
