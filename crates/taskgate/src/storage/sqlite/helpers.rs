//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Timestamps are stored as RFC 3339 text in UTC with microsecond precision,
//! and dates as `YYYY-MM-DD`, so both sort correctly as strings.

use crate::domain::{Role, Task, TaskId, TaskStatus, User, UserId};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// SQL column list for the tasks table.
///
/// Use with `row_to_task` for consistent column ordering.
pub(crate) const TASKS_COLUMNS: &str =
    "id, title, description, status, due_date, assigned_to, created_by, created_at, updated_at";

/// SQL column list for the users table.
///
/// Use with `row_to_user` for consistent column ordering.
pub(crate) const USERS_COLUMNS: &str = "id, name, email, credential_hash, role";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Format a timestamp for storage.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Format a date for storage.
pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_timestamp(column: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("invalid timestamp '{s}': {e}")))
}

fn parse_date(column: usize, s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| conversion_error(column, format!("invalid date '{s}': {e}")))
}

/// Parse a status string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_status(column: usize, s: &str) -> rusqlite::Result<TaskStatus> {
    s.parse()
        .map_err(|_| conversion_error(column, format!("Unknown task status '{s}' in database")))
}

/// Parse a role string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_role(column: usize, s: &str) -> rusqlite::Result<Role> {
    s.parse()
        .map_err(|_| conversion_error(column, format!("Unknown role '{s}' in database")))
}

/// Convert a row selected with [`TASKS_COLUMNS`] into a task.
pub(crate) fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    let due_date: Option<String> = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Task {
        id: TaskId(row.get(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        status: parse_status(3, &status)?,
        due_date: due_date.as_deref().map(|d| parse_date(4, d)).transpose()?,
        assigned_to: row.get::<_, Option<i64>>(5)?.map(UserId),
        created_by: UserId(row.get(6)?),
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

/// Convert a row selected with [`USERS_COLUMNS`] into a user.
pub(crate) fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(4)?;
    Ok(User {
        id: UserId(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        credential_hash: row.get(3)?,
        role: parse_role(4, &role)?,
    })
}

/// Returns `true` if the error is a constraint violation (unique, check, FK).
pub(crate) fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
