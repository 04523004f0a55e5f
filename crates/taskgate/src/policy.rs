//! Role-based access policy.
//!
//! Every authorization decision the lifecycle service makes goes through the
//! predicates in this module. Two base predicates, [`is_manager`] and
//! [`is_owner_or_assignee`], are combined into named capabilities so that a
//! rule like "only managers may delete" is written down once.

use crate::domain::{Role, Task, User, UserId};
use crate::error::{Error, Result};

/// The authenticated caller, as supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// Caller's user id
    pub id: UserId,

    /// Caller's role
    pub role: Role,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Which fields a caller may change on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// Any field
    Full,

    /// Status only
    StatusOnly,
}

/// Which tasks a caller sees when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Every task, optionally filtered by assignee
    All,

    /// Only tasks assigned to this user
    AssignedTo(UserId),
}

/// Returns `true` if the caller is a manager.
#[must_use]
pub fn is_manager(principal: &Principal) -> bool {
    principal.role == Role::Manager
}

/// Returns `true` if the caller created the task or is its assignee.
#[must_use]
pub fn is_owner_or_assignee(principal: &Principal, task: &Task) -> bool {
    task.created_by == principal.id || task.assigned_to == Some(principal.id)
}

/// Only managers create tasks.
#[must_use]
pub fn can_create_tasks(principal: &Principal) -> bool {
    is_manager(principal)
}

/// Only managers delete tasks.
#[must_use]
pub fn can_delete_tasks(principal: &Principal) -> bool {
    is_manager(principal)
}

/// Only managers attach dependencies.
#[must_use]
pub fn can_manage_dependencies(principal: &Principal) -> bool {
    is_manager(principal)
}

/// Managers see every task, anyone else only their own.
#[must_use]
pub fn can_view_task(principal: &Principal, task: &Task) -> bool {
    is_manager(principal) || is_owner_or_assignee(principal, task)
}

/// The fields the caller may change on `task`, or `None` if it may not
/// update it at all.
#[must_use]
pub fn update_scope(principal: &Principal, task: &Task) -> Option<UpdateScope> {
    if is_manager(principal) {
        Some(UpdateScope::Full)
    } else if is_owner_or_assignee(principal, task) {
        Some(UpdateScope::StatusOnly)
    } else {
        None
    }
}

/// The slice of the task list the caller may see.
#[must_use]
pub fn list_scope(principal: &Principal) -> ListScope {
    if is_manager(principal) {
        ListScope::All
    } else {
        ListScope::AssignedTo(principal.id)
    }
}

/// Turn a failed capability check into [`Error::AuthorizationDenied`].
///
/// # Errors
///
/// Returns `Error::AuthorizationDenied` with `reason` when `allowed` is false.
pub fn require(allowed: bool, reason: &str) -> Result<()> {
    if allowed {
        Ok(())
    } else {
        Err(Error::AuthorizationDenied(reason.to_string()))
    }
}

/// Check that the caller may create tasks.
///
/// Callers run this before decoding a payload, so a non-manager is refused
/// whatever it sent.
///
/// # Errors
///
/// Returns `Error::AuthorizationDenied` for anyone but a manager.
pub fn authorize_create(principal: &Principal) -> Result<()> {
    require(can_create_tasks(principal), "only managers can create tasks")
}

/// Check that the caller may delete tasks.
///
/// # Errors
///
/// Returns `Error::AuthorizationDenied` for anyone but a manager.
pub fn authorize_delete(principal: &Principal) -> Result<()> {
    require(can_delete_tasks(principal), "only managers can delete tasks")
}

/// Check that the caller may attach dependencies.
///
/// # Errors
///
/// Returns `Error::AuthorizationDenied` for anyone but a manager.
pub fn authorize_dependency_changes(principal: &Principal) -> Result<()> {
    require(
        can_manage_dependencies(principal),
        "only managers can manage task dependencies",
    )
}
