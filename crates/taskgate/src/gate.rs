//! Completion gate.
//!
//! A task may become completed only when none of its direct dependencies is
//! in any other state. Transitive dependencies are not inspected: each direct
//! dependency passed this same gate when it was completed.
//!
//! Dependencies are given as `(id, status)` pairs where a `None` status means
//! the dependency's task no longer exists. A dangling edge does not block.
//! A canceled dependency blocks exactly like a pending one.

use crate::domain::{TaskId, TaskStatus};

/// Returns `true` if a task whose direct dependencies are in the given
/// states may transition to completed.
pub fn can_complete<I>(dependencies: I) -> bool
where
    I: IntoIterator<Item = (TaskId, Option<TaskStatus>)>,
{
    dependencies.into_iter().all(|(_, status)| is_satisfied(status))
}

/// The direct dependencies that keep a task from completing, in input order.
pub fn unmet_dependencies<I>(dependencies: I) -> Vec<TaskId>
where
    I: IntoIterator<Item = (TaskId, Option<TaskStatus>)>,
{
    dependencies
        .into_iter()
        .filter(|&(_, status)| !is_satisfied(status))
        .map(|(id, _)| id)
        .collect()
}

fn is_satisfied(status: Option<TaskStatus>) -> bool {
    matches!(status, None | Some(TaskStatus::Completed))
}
