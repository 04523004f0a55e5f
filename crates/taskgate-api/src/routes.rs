//! HTTP route handlers.

use crate::auth::{self, CurrentUser};
use crate::error::Result;
use crate::models::{
    AddDependenciesRequest, CreateTaskRequest, CurrentUserResponse, HealthResponse,
    ListTasksQuery, MessageResponse, TaskResponse, UpdateTaskRequest,
};
use crate::server::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use std::sync::Arc;
use taskgate::domain::{Page, Task, TaskDetails, TaskId};
use taskgate::policy::{self, Principal};
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// `/api/health` is public; every other route requires a principal.
pub fn router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    let protected_routes = Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/:id",
            get(show_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
        .route("/api/tasks/:id/dependencies", post(add_dependencies))
        .route("/api/auth/current-user", get(current_user))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_principal,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        storage: state.storage.clone(),
    })
}

async fn current_user(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse { user })
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    query: std::result::Result<Query<ListTasksQuery>, QueryRejection>,
) -> Result<Json<Page<Task>>> {
    let Query(query) = query?;
    let (filter, page) = query.into_parts()?;
    let tasks = state.service.list_tasks(&principal, filter, page).await?;
    Ok(Json(tasks))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    payload: std::result::Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    policy::authorize_create(&principal)?;
    let Json(request) = payload?;
    let task = state.service.create_task(&principal, request.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new("Task created successfully", task)),
    ))
}

async fn show_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: std::result::Result<Path<TaskId>, PathRejection>,
) -> Result<Json<TaskDetails>> {
    let Path(id) = path?;
    Ok(Json(state.service.get_task(&principal, id).await?))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: std::result::Result<Path<TaskId>, PathRejection>,
    payload: std::result::Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let task = state
        .service
        .update_task(&principal, id, request.into_update()?)
        .await?;
    let message = if policy::is_manager(&principal) {
        "Task updated successfully"
    } else {
        "Task status updated successfully"
    };
    Ok(Json(TaskResponse::new(message, task)))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: std::result::Result<Path<TaskId>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    policy::authorize_delete(&principal)?;
    let Path(id) = path?;
    state.service.delete_task(&principal, id).await?;
    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

async fn add_dependencies(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    path: std::result::Result<Path<TaskId>, PathRejection>,
    payload: std::result::Result<Json<AddDependenciesRequest>, JsonRejection>,
) -> Result<Json<TaskResponse>> {
    policy::authorize_dependency_changes(&principal)?;
    let Path(id) = path?;
    let Json(request) = payload?;
    let task = state
        .service
        .add_dependencies(&principal, id, &request.dependencies)
        .await?;
    Ok(Json(TaskResponse::new("Dependencies added successfully", task)))
}
