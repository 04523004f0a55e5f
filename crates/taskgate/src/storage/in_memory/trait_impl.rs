//! Store trait implementations for in-memory storage.

use super::inner::StoreState;
use super::InMemoryStore;
use crate::domain::{NewUser, Page, PageRequest, Task, TaskDraft, TaskFilter, TaskId, User, UserId};
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::storage::{GraphStore, StoreTransaction, TaskStore};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// A transaction over an [`InMemoryStore`].
///
/// Holds the store lock until it is committed or dropped. Reads go to the
/// locked state; the first write clones it into `working`.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: Option<StoreState>,
}

impl InMemoryTransaction {
    fn state(&self) -> &StoreState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn state_mut(&mut self) -> &mut StoreState {
        let guard = &self.guard;
        self.working.get_or_insert_with(|| (**guard).clone())
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        tracing::trace!("Began in-memory transaction");
        Ok(Box::new(InMemoryTransaction {
            guard,
            working: None,
        }))
    }
}

#[async_trait]
impl GraphStore for InMemoryTransaction {
    async fn edge_exists(&mut self, task: TaskId, depends_on: TaskId) -> Result<bool> {
        Ok(self.state().graph.contains_edge(task, depends_on))
    }

    async fn add_edge(&mut self, task: TaskId, depends_on: TaskId) -> Result<()> {
        self.state_mut().graph.add_edge(task, depends_on);
        Ok(())
    }

    async fn dependencies_of(&mut self, task: TaskId) -> Result<BTreeSet<TaskId>> {
        Ok(self.state().graph.dependencies_of(task))
    }

    async fn dependents_of(&mut self, task: TaskId) -> Result<BTreeSet<TaskId>> {
        Ok(self.state().graph.dependents_of(task))
    }

    async fn dependency_graph(&mut self) -> Result<DependencyGraph> {
        Ok(self.state().graph.clone())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn insert_task(&mut self, draft: TaskDraft) -> Result<Task> {
        Ok(self.state_mut().insert_task(draft))
    }

    async fn get_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.state().tasks.get(&id).cloned())
    }

    async fn update_task(&mut self, task: &Task) -> Result<()> {
        self.state_mut().update_task(task)
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<bool> {
        Ok(self.state_mut().delete_task(id))
    }

    async fn list_tasks(&mut self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>> {
        Ok(self.state().list_tasks(filter, page))
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        self.state_mut().insert_user(user)
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { mut guard, working } = *self;
        if let Some(working) = working {
            *guard = working;
        }
        tracing::trace!("Committed in-memory transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, TaskStatus};
    use chrono::Utc;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: None,
            status: TaskStatus::Pending,
            due_date: None,
            assigned_to: None,
            created_by: UserId(1),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = InMemoryStore::new();

        let mut txn = store.begin().await.unwrap();
        let task = txn.insert_task(draft("kept")).await.unwrap();
        txn.commit().await.unwrap();

        let mut txn = store.begin().await.unwrap();
        assert_eq!(txn.get_task(task.id).await.unwrap(), Some(task));
    }

    #[tokio::test]
    async fn test_drop_discards_changes() {
        let store = InMemoryStore::new();

        let mut txn = store.begin().await.unwrap();
        let task = txn.insert_task(draft("discarded")).await.unwrap();
        txn.add_edge(task.id, TaskId(99)).await.unwrap();
        txn.insert_user(NewUser::new("Ada", "ada@example.com", Role::User))
            .await
            .unwrap();
        drop(txn);

        let mut txn = store.begin().await.unwrap();
        assert!(txn.get_task(task.id).await.unwrap().is_none());
        assert!(!txn.edge_exists(task.id, TaskId(99)).await.unwrap());
        assert!(txn.get_user(UserId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_edge_twice_keeps_one_edge() {
        let store = InMemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        txn.add_edge(TaskId(1), TaskId(2)).await.unwrap();
        txn.add_edge(TaskId(1), TaskId(2)).await.unwrap();
        assert_eq!(txn.dependency_graph().await.unwrap().edge_count(), 1);
        assert_eq!(
            txn.dependencies_of(TaskId(1)).await.unwrap(),
            BTreeSet::from([TaskId(2)])
        );
        assert_eq!(
            txn.dependents_of(TaskId(2)).await.unwrap(),
            BTreeSet::from([TaskId(1)])
        );
    }

    #[tokio::test]
    async fn test_reads_do_not_copy_state() {
        let store = InMemoryStore::new();
        let mut txn = store.begin().await.unwrap();
        let task = txn.insert_task(draft("existing")).await.unwrap();
        txn.commit().await.unwrap();

        let guard = Arc::clone(&store.state).lock_owned().await;
        let mut txn = InMemoryTransaction {
            guard,
            working: None,
        };
        assert_eq!(txn.get_task(task.id).await.unwrap(), Some(task.clone()));
        assert!(txn.get_user(UserId(1)).await.unwrap().is_none());
        assert_eq!(txn.dependency_graph().await.unwrap().edge_count(), 0);
        assert!(txn.working.is_none());

        txn.add_edge(task.id, TaskId(99)).await.unwrap();
        assert!(txn.working.is_some());
        assert!(!txn.guard.graph.contains_edge(task.id, TaskId(99)));
        assert!(txn.edge_exists(task.id, TaskId(99)).await.unwrap());
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let store = InMemoryStore::new();
        let first = store.begin().await.unwrap();

        let contender = store.clone();
        let handle = tokio::spawn(async move {
            let mut txn = contender.begin().await.unwrap();
            txn.get_task(TaskId(1)).await.unwrap()
        });

        let mut first = first;
        let task = first.insert_task(draft("first")).await.unwrap();
        first.commit().await.unwrap();

        // The second transaction could only start after the first committed.
        assert_eq!(handle.await.unwrap(), Some(task));
    }
}
