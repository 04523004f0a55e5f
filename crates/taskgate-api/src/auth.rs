//! Principal extraction.
//!
//! Authentication happens upstream. The identity provider forwards the
//! authenticated user's id in the [`PRINCIPAL_HEADER`] header; this layer
//! only resolves it against the user table and rejects unknown callers.

use crate::error::{Error, Result};
use crate::server::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use taskgate::domain::{User, UserId};
use taskgate::policy::Principal;

/// Header carrying the authenticated user's id.
pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// The authenticated user, available to handlers as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn principal_id(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(PRINCIPAL_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(UserId)
}

/// Middleware that resolves the caller and stores a [`Principal`] and a
/// [`CurrentUser`] in the request extensions.
///
/// # Errors
///
/// Returns `Error::Unauthenticated` if the header is missing, malformed or
/// names no known user.
pub async fn require_principal(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let id = principal_id(req.headers()).ok_or(Error::Unauthenticated)?;
    let Some(user) = state.service.find_user(id).await? else {
        tracing::debug!(user = %id, "Rejected unknown principal");
        return Err(Error::Unauthenticated);
    };

    req.extensions_mut().insert(Principal::from(&user));
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
