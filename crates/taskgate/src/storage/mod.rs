//! Storage abstraction layer for taskgate.
//!
//! This module provides the transactional store traits and a factory for
//! creating storage backends:
//!
//! - **In-memory**: ephemeral, backed by `BTreeMap`s and a petgraph graph
//! - **`SQLite`**: persistent, backed by a `rusqlite` connection
//!
//! # Architecture
//!
//! All reads and writes go through a [`StoreTransaction`] obtained from
//! [`TaskStore::begin`]. A transaction is all-or-nothing: [`StoreTransaction::commit`]
//! publishes every change made through it, and dropping it without
//! committing discards them. The lifecycle service opens one transaction per
//! use case and runs its cycle checks inside it, so a check always sees the
//! writes that precede it, including earlier edges of the same batch.
//!
//! [`GraphStore`] is the dependency relation part of a transaction. It is a
//! plain relation over `(task_id, depends_on_task_id)` pairs with no cycle or
//! business logic; [`GraphStore::add_edge`] is idempotent and is the
//! uniqueness backstop for concurrent duplicate attaches.
//!
//! Transaction methods take `&mut self` so a transaction only has to be
//! `Send`, which lets backends hold non-`Sync` handles such as a
//! `rusqlite::Connection`.
//!
//! # Example
//!
//! ```no_run
//! use taskgate::domain::{NewUser, Role};
//! use taskgate::storage::{create_storage, seed_user, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> taskgate::error::Result<()> {
//!     let store = create_storage(&StorageBackend::Sqlite("tasks.db".into()))?;
//!     let user = seed_user(
//!         store.as_ref(),
//!         NewUser::new("Ada", "ada@example.com", Role::Manager),
//!     )
//!     .await?;
//!     println!("seeded user {}", user.id);
//!     Ok(())
//! }
//! ```

use crate::domain::{NewUser, Page, PageRequest, Task, TaskDraft, TaskFilter, TaskId, User, UserId};
use crate::error::Result;
use crate::graph::DependencyGraph;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

pub mod in_memory;
pub mod sqlite;

/// Read/write primitives over the dependency relation.
///
/// Edges point from the dependent task to the task it depends on.
/// Endpoints are identifiers only; an edge may name a task that has been
/// deleted.
#[async_trait]
pub trait GraphStore: Send {
    /// Returns `true` if `task` directly depends on `depends_on`.
    async fn edge_exists(&mut self, task: TaskId, depends_on: TaskId) -> Result<bool>;

    /// Record that `task` depends on `depends_on`.
    ///
    /// Adding an edge that already exists is a no-op and succeeds.
    async fn add_edge(&mut self, task: TaskId, depends_on: TaskId) -> Result<()>;

    /// Direct dependencies of `task`.
    async fn dependencies_of(&mut self, task: TaskId) -> Result<BTreeSet<TaskId>>;

    /// Tasks that directly depend on `task`.
    async fn dependents_of(&mut self, task: TaskId) -> Result<BTreeSet<TaskId>>;

    /// Snapshot of the whole relation as seen by this transaction.
    async fn dependency_graph(&mut self) -> Result<DependencyGraph>;
}

/// A unit of work against a [`TaskStore`].
///
/// # Method Categories
///
/// - **Tasks**: `insert_task`, `get_task`, `update_task`, `delete_task`, `list_tasks`
/// - **Users**: `insert_user`, `get_user`
/// - **Dependencies**: inherited from [`GraphStore`]
/// - **Completion**: `commit` (rollback is dropping the transaction)
#[async_trait]
pub trait StoreTransaction: GraphStore {
    /// Insert a task and return it with its newly assigned identifier.
    ///
    /// Identifiers are never reused, even after deletes.
    async fn insert_task(&mut self, draft: TaskDraft) -> Result<Task>;

    /// Get a task by ID.
    ///
    /// Returns `None` if the task doesn't exist.
    async fn get_task(&mut self, id: TaskId) -> Result<Option<Task>>;

    /// Overwrite a stored task with `task`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` if no task has `task.id`.
    async fn update_task(&mut self, task: &Task) -> Result<()>;

    /// Delete a task and the edges going out of it.
    ///
    /// Edges pointing at the task are kept. Returns `false` if the task
    /// didn't exist.
    async fn delete_task(&mut self, id: TaskId) -> Result<bool>;

    /// List tasks matching `filter`, newest first (creation time, then id).
    async fn list_tasks(&mut self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>>;

    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the email is already taken.
    async fn insert_user(&mut self, user: NewUser) -> Result<User>;

    /// Get a user by ID.
    async fn get_user(&mut self, id: UserId) -> Result<Option<User>>;

    /// Publish every change made through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// A transactional task store.
///
/// Implementations must be `Send + Sync` so one store can serve concurrent
/// requests. Transactions on the same store are serialized or isolated by
/// the backend; see each backend for its isolation level.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Start a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// Storage backend configuration.
///
/// Determines which storage implementation to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// `SQLite` database file (persistent)
    Sqlite(PathBuf),
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::InMemory => write!(f, "memory"),
            StorageBackend::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
        }
    }
}

/// Create a storage instance for the given backend.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened or its schema
/// cannot be applied.
pub fn create_storage(backend: &StorageBackend) -> Result<Box<dyn TaskStore>> {
    tracing::debug!(%backend, "Creating storage");
    match backend {
        StorageBackend::InMemory => Ok(Box::new(in_memory::InMemoryStore::new())),
        StorageBackend::Sqlite(path) => Ok(Box::new(sqlite::SqliteStore::open(path)?)),
    }
}

/// Register a user in its own transaction.
///
/// # Errors
///
/// Returns `Error::Validation` for a malformed payload or a duplicate email,
/// or a store error if the transaction fails.
pub async fn seed_user(store: &dyn TaskStore, user: NewUser) -> Result<User> {
    user.validate()?;
    let mut txn = store.begin().await?;
    let user = txn.insert_user(user).await?;
    txn.commit().await?;
    tracing::debug!(user = %user.id, email = %user.email, "Seeded user");
    Ok(user)
}
