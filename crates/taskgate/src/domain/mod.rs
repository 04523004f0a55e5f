//! Domain types for task tracking.
//!
//! This module contains the core domain types for the taskgate tracker:
//! tasks, users, the closed status and role enums, and the request payloads
//! the lifecycle service accepts.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a task title, in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Default number of tasks per listing page.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Unique identifier for a task.
///
/// Identifiers are assigned by the store and never reused, so an edge that
/// points at a deleted task can never be mistaken for a later task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Extract the raw i64 value.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a task.
///
/// The set is closed: anything else is rejected while deserializing, before
/// it can reach the lifecycle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is open
    Pending,

    /// Task is done
    Completed,

    /// Task was abandoned
    Canceled,
}

impl TaskStatus {
    /// The wire and storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "canceled" => Ok(Self::Canceled),
            other => Err(Error::Validation(format!(
                "invalid status '{other}', expected one of: pending, completed, canceled"
            ))),
        }
    }
}

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Creates, edits, deletes and links any task
    Manager,

    /// Sees and updates the status of tasks assigned to them
    User,
}

impl Role {
    /// The wire and storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manager" => Ok(Self::Manager),
            "user" => Ok(Self::User),
            other => Err(Error::Validation(format!(
                "invalid role '{other}', expected one of: manager, user"
            ))),
        }
    }
}

/// Represents a task in the tracking system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for the task
    pub id: TaskId,

    /// Task title
    pub title: String,

    /// Task description (optional)
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// Due date (optional)
    pub due_date: Option<NaiveDate>,

    /// Assignee (optional)
    pub assigned_to: Option<UserId>,

    /// Manager who created the task
    pub created_by: UserId,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A task together with its direct neighbours in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    /// The task itself
    #[serde(flatten)]
    pub task: Task,

    /// Tasks this task depends on, ascending
    pub dependencies: Vec<TaskId>,

    /// Tasks that depend on this task, ascending
    pub dependents: Vec<TaskId>,
}

/// A user known to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Email address (unique)
    pub email: String,

    /// Opaque credential hash owned by the identity provider
    #[serde(skip_serializing, default)]
    pub credential_hash: String,

    /// Role
    pub role: Role,
}

/// Data for registering a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name
    pub name: String,

    /// Email address (must be unique)
    pub email: String,

    /// Opaque credential hash
    pub credential_hash: String,

    /// Role
    pub role: Role,
}

impl NewUser {
    /// Create a new user payload with an empty credential hash.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            credential_hash: String::new(),
            role,
        }
    }

    /// Set the credential hash.
    #[must_use]
    pub fn with_credential_hash(mut self, hash: impl Into<String>) -> Self {
        self.credential_hash = hash.into();
        self
    }

    /// Validate the payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the name is blank or the email is not
    /// shaped like an address.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("user name cannot be empty".to_string()));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(Error::Validation(format!("invalid email address '{email}'"))),
        }
    }
}

/// Data for creating a new task
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Task title
    pub title: String,

    /// Task description (optional)
    pub description: Option<String>,

    /// Due date (optional)
    pub due_date: Option<NaiveDate>,

    /// Assignee (optional)
    pub assigned_to: Option<UserId>,

    /// Tasks the new task depends on
    pub dependencies: Vec<TaskId>,
}

impl NewTask {
    /// Create a payload with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the due date.
    #[must_use]
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Set the assignee.
    #[must_use]
    pub fn with_assignee(mut self, user: UserId) -> Self {
        self.assigned_to = Some(user);
        self
    }

    /// Set the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = TaskId>) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// Validate the field rules that don't need the store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a blank or over-long title, or a due
    /// date before `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        validate_title(&self.title)?;
        if let Some(due_date) = self.due_date {
            validate_due_date(due_date, today)?;
        }
        Ok(())
    }
}

/// Data for updating an existing task.
///
/// `None` leaves a field unchanged. The nested options on nullable fields
/// distinguish "leave alone" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New title (if updating)
    pub title: Option<String>,

    /// New description (if updating, `Some(None)` to clear)
    pub description: Option<Option<String>>,

    /// New status (if updating)
    pub status: Option<TaskStatus>,

    /// New due date (if updating, `Some(None)` to clear)
    pub due_date: Option<Option<NaiveDate>>,

    /// New assignee (if updating, `Some(None)` to clear)
    pub assigned_to: Option<Option<UserId>>,
}

impl TaskUpdate {
    /// An update that only changes the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Returns `true` if any field other than `status` is set.
    #[must_use]
    pub fn touches_more_than_status(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.due_date.is_some()
            || self.assigned_to.is_some()
    }

    /// Validate the field rules that don't need the store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a blank or over-long title, or a due
    /// date before `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(Some(due_date)) = self.due_date {
            validate_due_date(due_date, today)?;
        }
        Ok(())
    }
}

/// Task fields handed to the store on insert.
///
/// The store assigns the identifier; everything else is decided by the
/// lifecycle service.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    /// Task title
    pub title: String,

    /// Task description
    pub description: Option<String>,

    /// Initial status
    pub status: TaskStatus,

    /// Due date
    pub due_date: Option<NaiveDate>,

    /// Assignee
    pub assigned_to: Option<UserId>,

    /// Creator
    pub created_by: UserId,

    /// Creation timestamp, also used as the first update timestamp
    pub created_at: DateTime<Utc>,
}

impl TaskDraft {
    /// Materialize the draft as a task with the given identifier.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            due_date: self.due_date,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Filter for listing tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Filter by status
    pub status: Option<TaskStatus>,

    /// Earliest due date (inclusive)
    pub due_date_from: Option<NaiveDate>,

    /// Latest due date (inclusive)
    pub due_date_to: Option<NaiveDate>,

    /// Filter by assignee
    pub assigned_to: Option<UserId>,
}

impl TaskFilter {
    /// Returns `true` if the task passes every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|status| task.status != status) {
            return false;
        }
        if let Some(from) = self.due_date_from {
            if task.due_date.is_none_or(|due| due < from) {
                return false;
            }
        }
        if let Some(to) = self.due_date_to {
            if task.due_date.is_none_or(|due| due > to) {
                return false;
            }
        }
        if let Some(assignee) = self.assigned_to {
            if task.assigned_to != Some(assignee) {
                return false;
            }
        }
        true
    }
}

/// Page selection for listings. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Page number, starting at 1
    pub page: u32,

    /// Items per page
    pub per_page: u32,
}

impl PageRequest {
    /// Create a page request, clamping both values to at least 1.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Number of items to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub data: Vec<T>,

    /// Page number, starting at 1
    pub current_page: u32,

    /// Items per page
    pub per_page: u32,

    /// Total number of matching items
    pub total: u64,

    /// Number of the last page (at least 1)
    pub last_page: u32,
}

impl<T> Page<T> {
    /// Assemble a page from its items and the total match count.
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        let pages = total.div_ceil(u64::from(request.per_page)).max(1);
        Self {
            data,
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(Error::Validation(format!(
            "title cannot exceed {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_due_date(due_date: NaiveDate, today: NaiveDate) -> Result<()> {
    if due_date < today {
        return Err(Error::Validation(format!(
            "due date {due_date} is in the past"
        )));
    }
    Ok(())
}
