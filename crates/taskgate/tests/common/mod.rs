//! Shared helpers for taskgate integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;
use taskgate::domain::{NewTask, NewUser, Role, TaskDetails, TaskId};
use taskgate::lifecycle::TaskService;
use taskgate::policy::Principal;
use taskgate::storage::in_memory::InMemoryStore;
use taskgate::storage::sqlite::SqliteStore;
use taskgate::storage::{seed_user, TaskStore};

/// Store adapters every lifecycle test runs against.
#[derive(Debug, Clone, Copy)]
pub enum Backend {
    InMemory,
    Sqlite,
}

impl Backend {
    pub fn open(self) -> Arc<dyn TaskStore> {
        match self {
            Backend::InMemory => Arc::new(InMemoryStore::new()),
            Backend::Sqlite => Arc::new(SqliteStore::open_in_memory().expect("open sqlite store")),
        }
    }
}

/// A service with a manager, an ordinary user and an unrelated user.
pub struct Harness {
    pub service: TaskService,
    pub manager: Principal,
    pub user: Principal,
    pub outsider: Principal,
}

impl Harness {
    pub async fn new(backend: Backend) -> Self {
        Self::with_store(backend.open()).await
    }

    pub async fn with_store(store: Arc<dyn TaskStore>) -> Self {
        let manager = seed(&*store, "Manager", "manager@example.com", Role::Manager).await;
        let user = seed(&*store, "User", "user@example.com", Role::User).await;
        let outsider = seed(&*store, "Outsider", "outsider@example.com", Role::User).await;
        Self {
            service: TaskService::new(store),
            manager,
            user,
            outsider,
        }
    }

    /// Create a task as the manager.
    pub async fn task(&self, title: &str) -> TaskId {
        self.create(NewTask::new(title)).await.task.id
    }

    /// Create a task as the manager, assigned to the ordinary user.
    pub async fn assigned_task(&self, title: &str) -> TaskId {
        self.create(NewTask::new(title).with_assignee(self.user.id))
            .await
            .task
            .id
    }

    pub async fn create(&self, new_task: NewTask) -> TaskDetails {
        self.service
            .create_task(&self.manager, new_task)
            .await
            .expect("create task")
    }

    pub async fn attach(&self, task: TaskId, dependencies: &[TaskId]) -> TaskDetails {
        self.service
            .add_dependencies(&self.manager, task, dependencies)
            .await
            .expect("attach dependencies")
    }

    pub async fn details(&self, task: TaskId) -> TaskDetails {
        self.service
            .get_task(&self.manager, task)
            .await
            .expect("get task")
    }
}

async fn seed(store: &dyn TaskStore, name: &str, email: &str, role: Role) -> Principal {
    let user = seed_user(store, NewUser::new(name, email, role))
        .await
        .expect("seed user");
    Principal::from(&user)
}

/// A date `days` from today (UTC).
pub fn days_from_today(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}
