//! HTTP API for taskgate task tracking.
//!
//! This crate exposes the [`taskgate`] lifecycle service as a JSON API built
//! on `axum`. Identity is supplied upstream: the caller's user id arrives in
//! the `x-user-id` header and is resolved against the user table.
//!
//! # Routes
//!
//! ## Tasks
//! - `GET /api/tasks` - List tasks (filters: `status`, `due_date_from`,
//!   `due_date_to`, `assigned_to`, `page`)
//! - `POST /api/tasks` - Create a task (managers)
//! - `GET /api/tasks/:id` - Show a task with its dependencies and dependents
//! - `PUT`/`PATCH /api/tasks/:id` - Update a task
//! - `DELETE /api/tasks/:id` - Delete a task (managers)
//! - `POST /api/tasks/:id/dependencies` - Attach dependencies (managers)
//!
//! ## Other
//! - `GET /api/auth/current-user` - The authenticated user
//! - `GET /api/health` - Liveness check (no principal required)

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use config::ApiConfig;
pub use error::{Error, Result};
pub use routes::router;
pub use server::{serve, AppState};
