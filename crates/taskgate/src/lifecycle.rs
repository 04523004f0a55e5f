//! Task lifecycle service.
//!
//! [`TaskService`] implements the use cases of the tracker on top of a
//! [`TaskStore`]. Every use case runs inside exactly one store transaction:
//! mutations either commit as a whole or are rolled back by dropping the
//! transaction on the first error, so a refused batch leaves no trace.
//!
//! Authorization comes first for the manager-only use cases (create, delete,
//! attach). Get and update look the task up first, so a missing task is
//! reported as not found before any ownership check.
//!
//! Cycle checks are run against a dependency graph re-read from the
//! transaction for every candidate edge. Nothing is cached between calls.

use crate::domain::{
    NewTask, Page, PageRequest, Task, TaskDetails, TaskDraft, TaskFilter, TaskId, TaskStatus,
    TaskUpdate, User, UserId, DEFAULT_PAGE_SIZE,
};
use crate::error::{Error, Result};
use crate::gate;
use crate::graph::would_create_cycle;
use crate::policy::{self, ListScope, Principal, UpdateScope};
use crate::storage::{StoreTransaction, TaskStore};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;

/// Orchestrates the store, the cycle checker, the completion gate and the
/// access policy.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    page_size: u32,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl TaskService {
    /// Create a service over `store` with the default page size.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of tasks per listing page (at least 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Number of tasks per listing page.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Look up a user, e.g. to resolve an authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns a store error if the lookup fails.
    pub async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let mut txn = self.store.begin().await?;
        txn.get_user(id).await
    }

    /// List the tasks visible to `principal`, newest first.
    ///
    /// Managers see every task and may filter by assignee. Anyone else only
    /// sees tasks assigned to them, whatever the filter says.
    ///
    /// # Errors
    ///
    /// Returns a store error if the listing fails.
    pub async fn list_tasks(
        &self,
        principal: &Principal,
        mut filter: TaskFilter,
        page: Option<u32>,
    ) -> Result<Page<Task>> {
        if let ListScope::AssignedTo(user) = policy::list_scope(principal) {
            filter.assigned_to = Some(user);
        }
        let request = PageRequest::new(page.unwrap_or(1), self.page_size);

        let mut txn = self.store.begin().await?;
        let page = txn.list_tasks(&filter, request).await?;
        tracing::debug!(
            user = %principal.id,
            page = page.current_page,
            total = page.total,
            "Listed tasks"
        );
        Ok(page)
    }

    /// Create a pending task and attach its initial dependencies.
    ///
    /// # Errors
    ///
    /// - `Error::AuthorizationDenied` unless the caller is a manager
    /// - `Error::Validation` for a bad title or a past due date
    /// - `Error::UserNotFound` for an unknown assignee
    /// - `Error::TaskNotFound` for an unknown dependency
    /// - `Error::CircularDependency` if a dependency would close a cycle;
    ///   the task itself is not created either
    pub async fn create_task(&self, principal: &Principal, new_task: NewTask) -> Result<TaskDetails> {
        policy::authorize_create(principal)?;
        let now = now();
        new_task.validate(now.date_naive())?;

        let mut txn = self.store.begin().await?;
        if let Some(assignee) = new_task.assigned_to {
            ensure_user_exists(txn.as_mut(), assignee).await?;
        }

        let NewTask {
            title,
            description,
            due_date,
            assigned_to,
            dependencies,
        } = new_task;
        let task = txn
            .insert_task(TaskDraft {
                title: title.trim().to_string(),
                description: normalize_text(description),
                status: TaskStatus::Pending,
                due_date,
                assigned_to,
                created_by: principal.id,
                created_at: now,
            })
            .await?;

        attach_dependencies(txn.as_mut(), task.id, &dependencies).await?;
        let details = load_details(txn.as_mut(), task).await?;
        txn.commit().await?;

        tracing::info!(
            task = %details.task.id,
            user = %principal.id,
            dependencies = details.dependencies.len(),
            "Created task"
        );
        Ok(details)
    }

    /// Fetch a task with its direct dependencies and dependents.
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskNotFound` for an unknown task and
    /// `Error::AuthorizationDenied` if the caller may not view it.
    pub async fn get_task(&self, principal: &Principal, id: TaskId) -> Result<TaskDetails> {
        let mut txn = self.store.begin().await?;
        let task = txn.get_task(id).await?.ok_or(Error::TaskNotFound(id))?;
        policy::require(
            policy::can_view_task(principal, &task),
            "you can only view tasks you created or are assigned to",
        )?;
        load_details(txn.as_mut(), task).await
    }

    /// Apply `update` to a task.
    ///
    /// Managers may change any field. The creator or assignee may only
    /// change the status and must send one. Moving a task to completed goes
    /// through the completion gate first.
    ///
    /// # Errors
    ///
    /// - `Error::TaskNotFound` for an unknown task
    /// - `Error::AuthorizationDenied` if the caller may not make this change
    /// - `Error::Validation` for bad field values or a missing status
    /// - `Error::UserNotFound` for an unknown assignee
    /// - `Error::CompletionBlocked` if a direct dependency is unfinished
    pub async fn update_task(
        &self,
        principal: &Principal,
        id: TaskId,
        update: TaskUpdate,
    ) -> Result<TaskDetails> {
        let mut txn = self.store.begin().await?;
        let mut task = txn.get_task(id).await?.ok_or(Error::TaskNotFound(id))?;

        match policy::update_scope(principal, &task) {
            None => {
                return Err(Error::AuthorizationDenied(
                    "you can only update tasks you created or are assigned to".to_string(),
                ));
            }
            Some(UpdateScope::StatusOnly) => {
                // Other fields in an assignee's update are refused outright,
                // never silently dropped.
                policy::require(
                    !update.touches_more_than_status(),
                    "users can only update the status of their tasks",
                )?;
                if update.status.is_none() {
                    return Err(Error::Validation("status is required".to_string()));
                }
            }
            Some(UpdateScope::Full) => {}
        }

        let now = now();
        update.validate(now.date_naive())?;
        if let Some(Some(assignee)) = update.assigned_to {
            ensure_user_exists(txn.as_mut(), assignee).await?;
        }
        if update.status == Some(TaskStatus::Completed) {
            ensure_can_complete(txn.as_mut(), id).await?;
        }

        apply_update(&mut task, update);
        task.updated_at = now;
        txn.update_task(&task).await?;
        let details = load_details(txn.as_mut(), task).await?;
        txn.commit().await?;

        tracing::info!(
            task = %id,
            user = %principal.id,
            status = %details.task.status,
            "Updated task"
        );
        Ok(details)
    }

    /// Delete a task.
    ///
    /// Edges from other tasks to this one stay behind and no longer block
    /// their dependents.
    ///
    /// # Errors
    ///
    /// Returns `Error::AuthorizationDenied` unless the caller is a manager and
    /// `Error::TaskNotFound` for an unknown task.
    pub async fn delete_task(&self, principal: &Principal, id: TaskId) -> Result<()> {
        policy::authorize_delete(principal)?;

        let mut txn = self.store.begin().await?;
        if !txn.delete_task(id).await? {
            return Err(Error::TaskNotFound(id));
        }
        txn.commit().await?;

        tracing::info!(task = %id, user = %principal.id, "Deleted task");
        Ok(())
    }

    /// Attach dependencies to an existing task as one batch.
    ///
    /// Edges that already exist are skipped. The first candidate that would
    /// close a cycle aborts the batch and nothing is attached.
    ///
    /// # Errors
    ///
    /// - `Error::AuthorizationDenied` unless the caller is a manager
    /// - `Error::Validation` for an empty batch
    /// - `Error::TaskNotFound` for an unknown task or dependency
    /// - `Error::CircularDependency` for a candidate that would close a cycle
    pub async fn add_dependencies(
        &self,
        principal: &Principal,
        id: TaskId,
        dependencies: &[TaskId],
    ) -> Result<TaskDetails> {
        policy::authorize_dependency_changes(principal)?;
        if dependencies.is_empty() {
            return Err(Error::Validation(
                "dependencies cannot be empty".to_string(),
            ));
        }

        let mut txn = self.store.begin().await?;
        let task = txn.get_task(id).await?.ok_or(Error::TaskNotFound(id))?;
        let added = attach_dependencies(txn.as_mut(), id, dependencies).await?;
        let details = load_details(txn.as_mut(), task).await?;
        txn.commit().await?;

        tracing::info!(task = %id, user = %principal.id, added, "Attached dependencies");
        Ok(details)
    }

    /// Returns `true` if making `task` depend on `dependency` would close a
    /// cycle. Read-only.
    ///
    /// # Errors
    ///
    /// Returns a store error if the graph cannot be read.
    pub async fn would_create_cycle(&self, task: TaskId, dependency: TaskId) -> Result<bool> {
        let mut txn = self.store.begin().await?;
        let graph = txn.dependency_graph().await?;
        Ok(would_create_cycle(&graph, task, dependency))
    }
}

/// Current time at the precision every store keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Trim free text; blank becomes absent.
fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn apply_update(task: &mut Task, update: TaskUpdate) {
    if let Some(title) = update.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = update.description {
        task.description = normalize_text(description);
    }
    if let Some(status) = update.status {
        task.status = status;
    }
    if let Some(due_date) = update.due_date {
        task.due_date = due_date;
    }
    if let Some(assigned_to) = update.assigned_to {
        task.assigned_to = assigned_to;
    }
}

async fn ensure_user_exists(txn: &mut dyn StoreTransaction, id: UserId) -> Result<()> {
    match txn.get_user(id).await? {
        Some(_) => Ok(()),
        None => Err(Error::UserNotFound(id)),
    }
}

/// Attach each candidate in order and return how many edges were added.
async fn attach_dependencies(
    txn: &mut dyn StoreTransaction,
    task: TaskId,
    candidates: &[TaskId],
) -> Result<usize> {
    let mut added = 0;
    for &dependency in candidates {
        if txn.edge_exists(task, dependency).await? {
            continue;
        }
        if txn.get_task(dependency).await?.is_none() {
            return Err(Error::TaskNotFound(dependency));
        }

        // Re-read so earlier edges of this batch are part of the check.
        let graph = txn.dependency_graph().await?;
        if would_create_cycle(&graph, task, dependency) {
            tracing::warn!(
                task = %task,
                depends_on = %dependency,
                "Refused dependency that would create a cycle"
            );
            return Err(Error::CircularDependency {
                task,
                depends_on: dependency,
            });
        }

        txn.add_edge(task, dependency).await?;
        added += 1;
    }
    Ok(added)
}

async fn ensure_can_complete(txn: &mut dyn StoreTransaction, task: TaskId) -> Result<()> {
    let dependencies = txn.dependencies_of(task).await?;
    let mut states = Vec::with_capacity(dependencies.len());
    for dependency in dependencies {
        let status = txn.get_task(dependency).await?.map(|t| t.status);
        states.push((dependency, status));
    }

    if gate::can_complete(states.iter().copied()) {
        return Ok(());
    }
    let pending = gate::unmet_dependencies(states);
    tracing::warn!(task = %task, pending = ?pending, "Refused completion");
    Err(Error::CompletionBlocked { task, pending })
}

async fn load_details(txn: &mut dyn StoreTransaction, task: Task) -> Result<TaskDetails> {
    let dependencies = txn.dependencies_of(task.id).await?.into_iter().collect();
    let dependents = txn.dependents_of(task.id).await?.into_iter().collect();
    Ok(TaskDetails {
        task,
        dependencies,
        dependents,
    })
}
