//! In-memory storage backend using `BTreeMap` and petgraph.
//!
//! This module provides a fast, **ephemeral** storage implementation where
//! all data is held in RAM and **lost when the process exits**. It is
//! suitable for tests, development, and short-lived demo servers.
//!
//! # Architecture
//!
//! - `BTreeMap<TaskId, Task>` and `BTreeMap<UserId, User>` for the records
//! - [`DependencyGraph`](crate::graph::DependencyGraph) (a petgraph `DiGraph`)
//!   for the dependency relation
//! - Monotonic counters for identifiers, so deleted ids are never handed out
//!   again
//!
//! # Transactions
//!
//! The state lives behind `Arc<Mutex<StoreState>>`. Beginning a transaction
//! takes an owned lock on it. Reads see the locked state directly; the first
//! write clones it into a working copy, and commit swaps the copy in.
//! Dropping the transaction drops the copy and releases the lock. Holding the
//! lock for the whole transaction serializes transactions, so isolation is
//! serializable. Read-only transactions cost no copy; a writing transaction
//! pays one O(n) clone.

mod inner;
mod trait_impl;

use inner::StoreState;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe in-memory task store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
