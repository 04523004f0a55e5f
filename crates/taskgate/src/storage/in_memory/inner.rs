//! Core in-memory storage data structures.
//!
//! This module contains the state that a transaction copies and commits.

use crate::domain::{NewUser, Page, PageRequest, Task, TaskDraft, TaskFilter, TaskId, User, UserId};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Everything the in-memory store knows.
///
/// Not thread-safe on its own; see the module docs of `in_memory` for how
/// it is shared.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreState {
    /// Tasks indexed by ID
    pub(super) tasks: BTreeMap<TaskId, Task>,

    /// Users indexed by ID
    pub(super) users: BTreeMap<UserId, User>,

    /// Dependency relation.
    ///
    /// Edge direction: source (dependent) -> target (dependency). Targets
    /// may be ids of deleted tasks.
    pub(super) graph: DependencyGraph,

    /// Last task id handed out
    last_task_id: i64,

    /// Last user id handed out
    last_user_id: i64,
}

impl StoreState {
    pub(super) fn insert_task(&mut self, draft: TaskDraft) -> Task {
        self.last_task_id += 1;
        let task = draft.into_task(TaskId(self.last_task_id));
        self.tasks.insert(task.id, task.clone());
        task
    }

    pub(super) fn update_task(&mut self, task: &Task) -> Result<()> {
        let slot = self
            .tasks
            .get_mut(&task.id)
            .ok_or(Error::TaskNotFound(task.id))?;
        *slot = task.clone();
        Ok(())
    }

    pub(super) fn delete_task(&mut self, id: TaskId) -> bool {
        if self.tasks.remove(&id).is_none() {
            return false;
        }
        self.graph.remove_outgoing(id);
        true
    }

    pub(super) fn list_tasks(&self, filter: &TaskFilter, page: PageRequest) -> Page<Task> {
        let mut matching: Vec<&Task> = self.tasks.values().filter(|t| filter.matches(t)).collect();
        matching.sort_by_key(|t| Reverse((t.created_at, t.id)));

        let total = matching.len() as u64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let data = matching
            .into_iter()
            .skip(skip)
            .take(page.per_page as usize)
            .cloned()
            .collect();

        Page::new(data, page, total)
    }

    pub(super) fn insert_user(&mut self, new_user: NewUser) -> Result<User> {
        let email = new_user.email.trim().to_string();
        if self
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&email))
        {
            return Err(Error::Validation(format!(
                "email '{email}' is already taken"
            )));
        }

        self.last_user_id += 1;
        let user = User {
            id: UserId(self.last_user_id),
            name: new_user.name,
            email,
            credential_hash: new_user.credential_hash,
            role: new_user.role,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, TaskStatus};
    use chrono::{Duration, Utc};

    fn draft(title: &str, offset_secs: i64) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            due_date: None,
            assigned_to: None,
            created_by: UserId(1),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn test_task_ids_are_not_reused_after_delete() {
        let mut state = StoreState::default();
        let first = state.insert_task(draft("a", 0));
        assert!(state.delete_task(first.id));
        let second = state.insert_task(draft("b", 0));
        assert!(second.id > first.id);
    }

    #[test]
    fn test_delete_keeps_incoming_edges() {
        let mut state = StoreState::default();
        let a = state.insert_task(draft("a", 0));
        let b = state.insert_task(draft("b", 0));
        let c = state.insert_task(draft("c", 0));
        state.graph.add_edge(a.id, b.id);
        state.graph.add_edge(b.id, c.id);

        assert!(state.delete_task(b.id));
        assert!(!state.delete_task(b.id));
        assert_eq!(state.graph.edges(), vec![(a.id, b.id)]);
    }

    #[test]
    fn test_list_is_newest_first_and_paged() {
        let mut state = StoreState::default();
        for i in 0..5 {
            state.insert_task(draft(&format!("task {i}"), i));
        }

        let page = state.list_tasks(&TaskFilter::default(), PageRequest::new(1, 2));
        let titles: Vec<_> = page.data.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["task 4", "task 3"]);
        assert_eq!(page.total, 5);
        assert_eq!(page.last_page, 3);

        let last = state.list_tasks(&TaskFilter::default(), PageRequest::new(3, 2));
        assert_eq!(last.data.len(), 1);
        assert_eq!(last.data[0].title, "task 0");
    }

    #[test]
    fn test_duplicate_email_is_rejected_case_insensitively() {
        let mut state = StoreState::default();
        state
            .insert_user(NewUser::new("Ada", "ada@example.com", Role::User))
            .unwrap();
        let err = state
            .insert_user(NewUser::new("Other", "ADA@example.com", Role::User))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
