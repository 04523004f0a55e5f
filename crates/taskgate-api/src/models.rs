//! Request and response bodies.
//!
//! Requests are decoded here and turned into core payloads; field rules that
//! need no store access are left to the core so both surfaces share them.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use taskgate::domain::{NewTask, TaskDetails, TaskFilter, TaskId, TaskStatus, TaskUpdate, User, UserId};
use taskgate::error::{Error, Result};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use together with `#[serde(default)]`.
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string of `GET /api/tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Only tasks in this status
    pub status: Option<TaskStatus>,

    /// Earliest due date (inclusive)
    pub due_date_from: Option<NaiveDate>,

    /// Latest due date (inclusive)
    pub due_date_to: Option<NaiveDate>,

    /// Only tasks assigned to this user (managers only)
    pub assigned_to: Option<UserId>,

    /// Page number, starting at 1
    pub page: Option<u32>,
}

impl ListTasksQuery {
    /// Split into the core filter and the requested page.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the due date range is inverted.
    pub fn into_parts(self) -> Result<(TaskFilter, Option<u32>)> {
        if let (Some(from), Some(to)) = (self.due_date_from, self.due_date_to) {
            if to < from {
                return Err(Error::Validation(
                    "due_date_to must be on or after due_date_from".to_string(),
                ));
            }
        }
        let filter = TaskFilter {
            status: self.status,
            due_date_from: self.due_date_from,
            due_date_to: self.due_date_to,
            assigned_to: self.assigned_to,
        };
        Ok((filter, self.page))
    }
}

/// Body of `POST /api/tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// Task title
    pub title: String,

    /// Task description
    #[serde(default)]
    pub description: Option<String>,

    /// Due date
    #[serde(default)]
    pub due_date: Option<NaiveDate>,

    /// Assignee
    #[serde(default)]
    pub assigned_to: Option<UserId>,

    /// Tasks the new task depends on
    #[serde(default)]
    pub dependencies: Option<Vec<TaskId>>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(request: CreateTaskRequest) -> Self {
        NewTask {
            title: request.title,
            description: request.description,
            due_date: request.due_date,
            assigned_to: request.assigned_to,
            dependencies: request.dependencies.unwrap_or_default(),
        }
    }
}

/// Body of `PUT`/`PATCH /api/tasks/:id`.
///
/// Absent fields are left unchanged; `null` clears the nullable ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title
    #[serde(default, deserialize_with = "double_option")]
    pub title: Option<Option<String>>,

    /// New description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    /// New status
    #[serde(default)]
    pub status: Option<TaskStatus>,

    /// New due date
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,

    /// New assignee
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<UserId>>,
}

impl UpdateTaskRequest {
    /// Convert into the core update payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `title` is explicitly `null`.
    pub fn into_update(self) -> Result<TaskUpdate> {
        let title = match self.title {
            Some(None) => return Err(Error::Validation("title cannot be null".to_string())),
            Some(Some(title)) => Some(title),
            None => None,
        };
        Ok(TaskUpdate {
            title,
            description: self.description,
            status: self.status,
            due_date: self.due_date,
            assigned_to: self.assigned_to,
        })
    }
}

/// Body of `POST /api/tasks/:id/dependencies`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddDependenciesRequest {
    /// Tasks to depend on
    pub dependencies: Vec<TaskId>,
}

/// A confirmation message with the affected task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Human-readable outcome
    pub message: String,

    /// The task after the change
    pub task: TaskDetails,
}

impl TaskResponse {
    /// Pair `task` with `message`.
    pub fn new(message: impl Into<String>, task: TaskDetails) -> Self {
        Self {
            message: message.into(),
            task,
        }
    }
}

/// A bare confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

/// Body of `GET /api/auth/current-user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    /// The authenticated user (without credential hash)
    pub user: User,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`
    pub status: String,

    /// Storage backend in use
    pub storage: String,
}
