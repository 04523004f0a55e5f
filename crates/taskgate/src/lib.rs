//! Taskgate - task tracking with role-based access and dependency gating.
//!
//! The crate is the core of a task-tracking service. It owns the parts with
//! real invariants and leaves routing, identity and presentation to callers:
//!
//! - [`graph`]: the dependency graph snapshot and the cycle checker
//! - [`gate`]: the completion gate over direct dependencies
//! - [`policy`]: role-based capability predicates
//! - [`storage`]: transactional store traits plus in-memory and `SQLite` backends
//! - [`lifecycle`]: the use cases, each run inside one store transaction
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskgate::domain::{NewTask, NewUser, Role};
//! use taskgate::lifecycle::TaskService;
//! use taskgate::policy::Principal;
//! use taskgate::storage::{create_storage, StorageBackend};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> taskgate::error::Result<()> {
//!     let store = create_storage(&StorageBackend::InMemory)?;
//!     let manager = taskgate::storage::seed_user(
//!         store.as_ref(),
//!         NewUser::new("Manager", "manager@example.com", Role::Manager),
//!     )
//!     .await?;
//!
//!     let service = TaskService::new(Arc::from(store));
//!     let principal = Principal::from(&manager);
//!     let task = service.create_task(&principal, NewTask::new("Write docs")).await?;
//!     println!("created task {}", task.task.id);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod gate;
pub mod graph;
pub mod lifecycle;
pub mod policy;
pub mod storage;
