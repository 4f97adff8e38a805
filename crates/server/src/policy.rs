//! Access policy evaluation for grocery lists.
//!
//! Pure decision functions over the current persisted state: ownership plus
//! share records. Callers must re-read list and shares from the store on
//! every sensitive call and re-evaluate - a revoked share has to be observed
//! on the very next check, so no decision is ever cached.

use pantry_core::UserId;

use crate::models::{GroceryList, ListShare};

/// True iff the principal may read the list: owner, or holder of any share.
#[must_use]
pub fn can_read(principal: UserId, list: &GroceryList, shares: &[ListShare]) -> bool {
    principal == list.owner_id || shares.iter().any(|s| s.shared_with_user_id == principal)
}

/// True iff the principal may mutate the list's contents: owner, or holder
/// of a share with `can_edit`.
#[must_use]
pub fn can_edit(principal: UserId, list: &GroceryList, shares: &[ListShare]) -> bool {
    principal == list.owner_id
        || shares
            .iter()
            .any(|s| s.shared_with_user_id == principal && s.can_edit)
}

/// True iff the principal owns the list.
///
/// Deleting a list and managing its shares (including magic links) are
/// owner-only and never delegable to an editor.
#[must_use]
pub fn is_owner(principal: UserId, list: &GroceryList) -> bool {
    principal == list.owner_id
}
