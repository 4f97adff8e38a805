//! Item groups: named sections of a list, ordered by `sort_order` with
//! creation time as the tie-break. Deleting a group detaches its items
//! rather than deleting them.

use chrono::Utc;
use pantry_core::{GroupId, ListId, Principal};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::ItemGroup;
use crate::state::AppState;

use super::authorize_edit;

#[derive(Debug, Deserialize)]
pub struct GroupInput {
    pub name: String,
    #[serde(default)]
    pub sort_order: i32,
}

fn validate_input(input: &GroupInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "group name must not be empty".to_owned(),
        ));
    }
    Ok(())
}

pub async fn create_group(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    input: GroupInput,
) -> Result<ItemGroup> {
    validate_input(&input)?;
    authorize_edit(state, principal.id, list_id).await?;

    let now = Utc::now();
    let group = ItemGroup {
        id: GroupId::generate(),
        list_id,
        name: input.name,
        sort_order: input.sort_order,
        created_at: now,
        updated_at: now,
    };
    state.store().create_group(&group).await?;
    Ok(group)
}

pub async fn update_group(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    group_id: GroupId,
    input: GroupInput,
) -> Result<ItemGroup> {
    validate_input(&input)?;
    authorize_edit(state, principal.id, list_id).await?;
    let mut group = load_group(state, list_id, group_id).await?;

    group.name = input.name;
    group.sort_order = input.sort_order;
    group.updated_at = Utc::now();
    state.store().update_group(&group).await?;
    Ok(group)
}

pub async fn delete_group(
    state: &AppState,
    principal: &Principal,
    list_id: ListId,
    group_id: GroupId,
) -> Result<()> {
    authorize_edit(state, principal.id, list_id).await?;
    let group = load_group(state, list_id, group_id).await?;
    state.store().delete_group(group.id).await?;
    Ok(())
}

async fn load_group(state: &AppState, list_id: ListId, group_id: GroupId) -> Result<ItemGroup> {
    state
        .store()
        .get_group(group_id)
        .await?
        .filter(|group| group.list_id == list_id)
        .ok_or_else(|| AppError::NotFound(format!("group {group_id}")))
}
