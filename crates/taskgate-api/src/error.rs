//! Error types for the taskgate API server.
//!
//! Every error renders as a JSON body `{"message": ...}`. Core errors map to
//! a status code by their [`ErrorKind`]; store failures are logged and
//! reported without detail.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use taskgate::error::ErrorKind;
use thiserror::Error;

/// Errors that can occur in the API server.
#[derive(Debug, Error)]
pub enum Error {
    /// No principal header, or it names no known user.
    #[error("Unauthenticated.")]
    Unauthenticated,

    /// Request body or query string could not be decoded.
    #[error("{0}")]
    InvalidRequest(String),

    /// A path segment does not name a resource, e.g. a non-numeric task id.
    #[error("{0}")]
    InvalidPath(String),

    /// An error from the taskgate core.
    #[error(transparent)]
    Core(#[from] taskgate::error::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::InvalidPath(_) => StatusCode::NOT_FOUND,
            Error::Core(e) => match e.kind() {
                ErrorKind::AuthorizationDenied => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::CircularDependencyRejected
                | ErrorKind::CompletionBlocked
                | ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidPath(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Server Error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
