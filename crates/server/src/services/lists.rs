//! List CRUD. Deletion is owner-only; metadata edits follow the same
//! rule as item edits (owner or edit share).

use chrono::Utc;
use pantry_core::{ListId, Principal};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{GroceryItem, GroceryList, ItemGroup};
use crate::state::AppState;

use super::{authorize_edit, authorize_owner, authorize_read};

#[derive(Debug, Deserialize)]
pub struct ListInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub auto_remove_after_secs: Option<i64>,
}

/// A list together with its contents, as returned by the detail endpoint.
/// Groups come back in display order (`sort_order`, then creation time).
#[derive(Debug, Serialize)]
pub struct ListDetail {
    pub list: GroceryList,
    pub groups: Vec<ItemGroup>,
    pub items: Vec<GroceryItem>,
}

fn validate_input(input: &ListInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("list name must not be empty".to_owned()));
    }
    if input.auto_remove_after_secs.is_some_and(|secs| secs <= 0) {
        return Err(AppError::BadRequest(
            "auto_remove_after_secs must be positive".to_owned(),
        ));
    }
    Ok(())
}

pub async fn create_list(
    state: &AppState,
    principal: &Principal,
    input: ListInput,
) -> Result<GroceryList> {
    validate_input(&input)?;
    state.store().ensure_user(principal).await?;

    let now = Utc::now();
    let list = GroceryList {
        id: ListId::generate(),
        owner_id: principal.id,
        name: input.name,
        description: input.description,
        auto_remove_after_secs: input.auto_remove_after_secs,
        created_at: now,
        updated_at: now,
    };
    state.store().create_list(&list).await?;
    Ok(list)
}

pub async fn list_lists(state: &AppState, principal: &Principal) -> Result<Vec<GroceryList>> {
    state.store().ensure_user(principal).await?;
    Ok(state.store().lists_for_user(principal.id).await?)
}

pub async fn get_list_detail(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
) -> Result<ListDetail> {
    let list = authorize_read(state, principal.id, list_id).await?;
    let groups = state.store().groups_for_list(list_id).await?;
    let items = state.store().items_for_list(list_id).await?;
    Ok(ListDetail { list, groups, items })
}

pub async fn update_list(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    input: ListInput,
) -> Result<GroceryList> {
    validate_input(&input)?;
    let mut list = authorize_edit(state, principal.id, list_id).await?;

    list.name = input.name;
    list.description = input.description;
    list.auto_remove_after_secs = input.auto_remove_after_secs;
    list.updated_at = Utc::now();
    state.store().update_list(&list).await?;
    Ok(list)
}

pub async fn delete_list(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
) -> Result<()> {
    authorize_owner(state, principal.id, list_id).await?;
    state.store().delete_list(list_id).await?;
    Ok(())
}
