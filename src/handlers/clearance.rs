// src/handlers/clearance.rs

use crate::{
    auth::AuthActor,
    errors::AppResult,
    models::{ClearanceTask, ResolveTaskRequest, StartTaskRequest},
    services::lifecycle::ExitLifecycleService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use tracing::debug;
use uuid::Uuid;

/// Move a pending clearance task to in-progress
#[utoipa::path(
    post,
    path = "/api/v1/exit/tasks/{task_id}/start",
    params(("task_id" = Uuid, Path, description = "Clearance task ID")),
    request_body(content = StartTaskRequest, description = "Optional assignee"),
    responses(
        (status = 200, description = "Task started", body = ClearanceTask),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task already resolved or case not in clearance"),
    ),
    security(("bearer_auth" = [])),
    tag = "Clearance"
)]
pub async fn start_task(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    body: Option<Json<StartTaskRequest>>,
) -> AppResult<Json<ClearanceTask>> {
    let Json(body) = body.unwrap_or_default();
    let task = ExitLifecycleService::new(&state)
        .start_task(&auth, task_id, body.assigned_to)
        .await?;
    Ok(Json(task))
}

/// Mark a clearance task cleared
#[utoipa::path(
    post,
    path = "/api/v1/exit/tasks/{task_id}/complete",
    params(("task_id" = Uuid, Path, description = "Clearance task ID")),
    responses(
        (status = 200, description = "Task cleared", body = ClearanceTask),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task already resolved or case not in clearance"),
    ),
    security(("bearer_auth" = [])),
    tag = "Clearance"
)]
pub async fn complete_task(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<ClearanceTask>> {
    debug!("{} completing clearance task {}", auth.name, task_id);
    let task = ExitLifecycleService::new(&state)
        .complete_task(&auth, task_id)
        .await?;
    Ok(Json(task))
}

/// Resolve a task as cleared or not applicable, optionally recording an asset recovery amount
#[utoipa::path(
    post,
    path = "/api/v1/exit/tasks/{task_id}/resolve",
    params(("task_id" = Uuid, Path, description = "Clearance task ID")),
    request_body = ResolveTaskRequest,
    responses(
        (status = 200, description = "Task resolved", body = ClearanceTask),
        (status = 400, description = "Invalid resolution or negative recovery amount"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "Task already resolved or case not in clearance"),
    ),
    security(("bearer_auth" = [])),
    tag = "Clearance"
)]
pub async fn resolve_task(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<ResolveTaskRequest>,
) -> AppResult<Json<ClearanceTask>> {
    let task = ExitLifecycleService::new(&state)
        .resolve_task(&auth, task_id, body)
        .await?;
    Ok(Json(task))
}
