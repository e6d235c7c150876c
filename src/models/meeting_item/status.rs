//! The meeting item status workflow.
//!
//! ```text
//! Draft -> Submitted -> Proposed -> Planned -> Discussed
//!              |            |          |
//!              +------------+----------+----> Denied
//! ```
//!
//! Discussed and Denied are terminal. Submitting a draft is open to the
//! item's owners; every other edge needs `meeting_item.status`.

use super::types::ItemStatus;
use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::models::user::PERM_ITEM_STATUS;

impl ItemStatus {
    /// Statuses directly reachable from this one.
    pub fn next_statuses(&self) -> &'static [ItemStatus] {
        match self {
            ItemStatus::Draft => &[ItemStatus::Submitted],
            ItemStatus::Submitted => &[ItemStatus::Proposed, ItemStatus::Denied],
            ItemStatus::Proposed => &[ItemStatus::Planned, ItemStatus::Denied],
            ItemStatus::Planned => &[ItemStatus::Discussed, ItemStatus::Denied],
            ItemStatus::Discussed | ItemStatus::Denied => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }

    pub fn can_transition_to(&self, to: ItemStatus) -> bool {
        self.next_statuses().contains(&to)
    }
}

fn may_take_edge(from: ItemStatus, user: &CurrentUser, is_owner: bool) -> bool {
    user.permissions.has(PERM_ITEM_STATUS) || (from == ItemStatus::Draft && is_owner)
}

/// Check that `user` may move an item from `from` to `to`.
/// Illegal edges are a 400, legal edges the user may not take are a 403.
pub fn check_transition(from: ItemStatus, to: ItemStatus, user: &CurrentUser, is_owner: bool) -> Result<(), AppError> {
    if from == to {
        return Err(AppError::BadRequest(format!("Meeting item is already {from}")));
    }
    if !from.can_transition_to(to) {
        return Err(AppError::BadRequest(format!("Cannot change status from {from} to {to}")));
    }
    if !may_take_edge(from, user, is_owner) {
        return Err(AppError::PermissionDenied(PERM_ITEM_STATUS.to_string()));
    }
    Ok(())
}

/// Transitions `user` could take from `from`, for rendering actions.
pub fn available_transitions(from: ItemStatus, user: &CurrentUser, is_owner: bool) -> Vec<ItemStatus> {
    if !may_take_edge(from, user, is_owner) {
        return Vec::new();
    }
    from.next_statuses().to_vec()
}
