//! Store trait implementations for the `SQLite` backend.

use super::helpers::{
    format_date, format_timestamp, is_constraint_violation, row_to_task, row_to_user,
    TASKS_COLUMNS, USERS_COLUMNS,
};
use crate::domain::{NewUser, Page, PageRequest, Task, TaskDraft, TaskFilter, TaskId, User, UserId};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::storage::{GraphStore, StoreTransaction};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;
use tokio::sync::OwnedMutexGuard;

/// An open `BEGIN IMMEDIATE` transaction on the store's connection.
pub(super) struct SqliteTransaction {
    conn: OwnedMutexGuard<Connection>,
    finished: bool,
}

impl SqliteTransaction {
    pub(super) fn begin(conn: OwnedMutexGuard<Connection>) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        tracing::trace!("Began SQLite transaction");
        Ok(Self {
            conn,
            finished: false,
        })
    }

    fn select_ids(&self, sql: &str, id: TaskId) -> Result<BTreeSet<TaskId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map([id.as_i64()], |row| row.get::<_, i64>(0).map(TaskId))?
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => tracing::trace!("Rolled back SQLite transaction"),
            Err(e) => tracing::warn!(error = %e, "Failed to roll back SQLite transaction"),
        }
    }
}

/// Build the WHERE clause and its parameters for a task filter.
fn filter_clause(filter: &TaskFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(from) = filter.due_date_from {
        clauses.push("due_date >= ?");
        values.push(Value::Text(format_date(from)));
    }
    if let Some(to) = filter.due_date_to {
        clauses.push("due_date <= ?");
        values.push(Value::Text(format_date(to)));
    }
    if let Some(assignee) = filter.assigned_to {
        clauses.push("assigned_to = ?");
        values.push(Value::Integer(assignee.as_i64()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

#[async_trait]
impl GraphStore for SqliteTransaction {
    async fn edge_exists(&mut self, task: TaskId, depends_on: TaskId) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM task_dependencies
                           WHERE task_id = ?1 AND depends_on_task_id = ?2)",
            params![task.as_i64(), depends_on.as_i64()],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    async fn add_edge(&mut self, task: TaskId, depends_on: TaskId) -> Result<()> {
        // The primary key turns a duplicate into a no-op.
        self.conn.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_id, depends_on_task_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![
                task.as_i64(),
                depends_on.as_i64(),
                format_timestamp(Utc::now())
            ],
        )?;
        Ok(())
    }

    async fn dependencies_of(&mut self, task: TaskId) -> Result<BTreeSet<TaskId>> {
        self.select_ids(
            "SELECT depends_on_task_id FROM task_dependencies WHERE task_id = ?1",
            task,
        )
    }

    async fn dependents_of(&mut self, task: TaskId) -> Result<BTreeSet<TaskId>> {
        self.select_ids(
            "SELECT task_id FROM task_dependencies WHERE depends_on_task_id = ?1",
            task,
        )
    }

    async fn dependency_graph(&mut self) -> Result<DependencyGraph> {
        let mut stmt = self
            .conn
            .prepare("SELECT task_id, depends_on_task_id FROM task_dependencies")?;
        let edges = stmt
            .query_map([], |row| {
                Ok((TaskId(row.get(0)?), TaskId(row.get(1)?)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(DependencyGraph::from_edges(edges))
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn insert_task(&mut self, draft: TaskDraft) -> Result<Task> {
        let created_at = format_timestamp(draft.created_at);
        self.conn.execute(
            "INSERT INTO tasks (title, description, status, due_date, assigned_to, created_by,
                                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                draft.title,
                draft.description,
                draft.status.as_str(),
                draft.due_date.map(format_date),
                draft.assigned_to.map(UserId::as_i64),
                draft.created_by.as_i64(),
                created_at,
            ],
        )?;
        let id = TaskId(self.conn.last_insert_rowid());
        Ok(draft.into_task(id))
    }

    async fn get_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASKS_COLUMNS} FROM tasks WHERE id = ?1"),
                [id.as_i64()],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    async fn update_task(&mut self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, status = ?3, due_date = ?4, assigned_to = ?5,
                 created_by = ?6, created_at = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                task.title,
                task.description,
                task.status.as_str(),
                task.due_date.map(format_date),
                task.assigned_to.map(UserId::as_i64),
                task.created_by.as_i64(),
                format_timestamp(task.created_at),
                format_timestamp(task.updated_at),
                task.id.as_i64(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::TaskNotFound(task.id));
        }
        Ok(())
    }

    async fn delete_task(&mut self, id: TaskId) -> Result<bool> {
        // Outgoing edges go with the task (ON DELETE CASCADE); incoming ones stay.
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", [id.as_i64()])?;
        Ok(changed > 0)
    }

    async fn list_tasks(&mut self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>> {
        let (where_sql, mut values) = filter_clause(filter);

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM tasks{where_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(i64::from(page.per_page)));
        values.push(Value::Integer(
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ));
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASKS_COLUMNS} FROM tasks{where_sql}
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))?;
        let data = stmt
            .query_map(params_from_iter(values.iter()), row_to_task)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Page::new(
            data,
            page,
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn insert_user(&mut self, user: NewUser) -> Result<User> {
        let email = user.email.trim().to_string();
        let result = self.conn.execute(
            "INSERT INTO users (name, email, credential_hash, role) VALUES (?1, ?2, ?3, ?4)",
            params![user.name, email, user.credential_hash, user.role.as_str()],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(Error::Validation(format!(
                    "email '{email}' is already taken"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: UserId(self.conn.last_insert_rowid()),
            name: user.name,
            email,
            credential_hash: user.credential_hash,
            role: user.role,
        })
    }

    async fn get_user(&mut self, id: UserId) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USERS_COLUMNS} FROM users WHERE id = ?1"),
                [id.as_i64()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        tracing::trace!("Committed SQLite transaction");
        Ok(())
    }
}
