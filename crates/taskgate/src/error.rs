//! Error types for taskgate operations.
//!
//! Every refusal the lifecycle service can produce is a variant here. The
//! cycle checker and the completion gate never return errors themselves; the
//! service turns their negative answers into [`Error::CircularDependency`]
//! and [`Error::CompletionBlocked`].
//!
//! [`ErrorKind`] groups the variants the way callers react to them, using a
//! 4xx/5xx style split: everything except [`ErrorKind::StoreFailure`] is the
//! caller's problem and is never worth retrying unchanged.

use crate::domain::{TaskId, UserId};
use std::fmt;
use thiserror::Error;

/// Result type for taskgate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for taskgate operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller lacks the role or ownership the operation needs
    #[error("Unauthorized: {0}")]
    AuthorizationDenied(String),

    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Adding the edge `task -> depends_on` would close a cycle
    #[error("Circular dependency detected: task {task} cannot depend on task {depends_on}")]
    CircularDependency {
        /// The task that would gain the dependency
        task: TaskId,
        /// The dependency that was refused
        depends_on: TaskId,
    },

    /// Completion requested while direct dependencies are unfinished
    #[error("Cannot complete task {task}: pending dependencies {}", format_ids(.pending))]
    CompletionBlocked {
        /// The task whose completion was refused
        task: TaskId,
        /// Direct dependencies that are not completed
        pending: Vec<TaskId>,
    },

    /// Input failed a field rule
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How callers should treat an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // === Caller problems (analogous to HTTP 4xx) ===
    /// Missing role or ownership
    AuthorizationDenied,

    /// Referenced task or user does not exist
    NotFound,

    /// Edge would break acyclicity
    CircularDependencyRejected,

    /// Completion gate refused the transition
    CompletionBlocked,

    /// Field rule violated
    Validation,

    // === Internal problems (analogous to HTTP 5xx) ===
    /// Persistence or configuration failure
    StoreFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthorizationDenied => write!(f, "authorization denied"),
            Self::NotFound => write!(f, "not found"),
            Self::CircularDependencyRejected => write!(f, "circular dependency rejected"),
            Self::CompletionBlocked => write!(f, "completion blocked"),
            Self::Validation => write!(f, "validation failed"),
            Self::StoreFailure => write!(f, "store failure"),
        }
    }
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthorizationDenied(_) => ErrorKind::AuthorizationDenied,
            Self::TaskNotFound(_) | Self::UserNotFound(_) => ErrorKind::NotFound,
            Self::CircularDependency { .. } => ErrorKind::CircularDependencyRejected,
            Self::CompletionBlocked { .. } => ErrorKind::CompletionBlocked,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) | Self::Database(_) | Self::Io(_) => {
                ErrorKind::StoreFailure
            }
        }
    }

    /// Returns `true` for errors caused by the caller's request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::StoreFailure
    }
}

fn format_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::denied(Error::AuthorizationDenied("managers only".into()), ErrorKind::AuthorizationDenied)]
    #[case::task_missing(Error::TaskNotFound(TaskId(4)), ErrorKind::NotFound)]
    #[case::user_missing(Error::UserNotFound(UserId(4)), ErrorKind::NotFound)]
    #[case::cycle(
        Error::CircularDependency { task: TaskId(1), depends_on: TaskId(2) },
        ErrorKind::CircularDependencyRejected
    )]
    #[case::blocked(
        Error::CompletionBlocked { task: TaskId(1), pending: vec![TaskId(2)] },
        ErrorKind::CompletionBlocked
    )]
    #[case::validation(Error::Validation("title".into()), ErrorKind::Validation)]
    #[case::storage(Error::Storage("disk full".into()), ErrorKind::StoreFailure)]
    fn test_error_kind_classification(#[case] error: Error, #[case] kind: ErrorKind) {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.is_client_error(), kind != ErrorKind::StoreFailure);
    }

    #[test]
    fn test_completion_blocked_lists_pending_ids() {
        let error = Error::CompletionBlocked {
            task: TaskId(9),
            pending: vec![TaskId(2), TaskId(5)],
        };
        let message = error.to_string();
        assert!(message.contains("task 9"));
        assert!(message.contains("2, 5"));
    }

    #[test]
    fn test_database_errors_are_store_failures() {
        let error = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(error.kind(), ErrorKind::StoreFailure);
    }
}
