// src/handlers/exit_case.rs

use crate::{
    auth::AuthActor,
    errors::AppResult,
    models::{
        ApproveExitRequest, CancelExitRequest, ClearanceProgress, ClearanceTask, EmployeeRecord,
        ExitCaseDetail, ExitCaseList, ExitStats, InitiateExitRequest, ListCasesQuery,
        UpdateExitCaseRequest,
    },
    services::lifecycle::ExitLifecycleService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Open an exit case for an active employee
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases",
    request_body = InitiateExitRequest,
    responses(
        (status = 201, description = "Exit case initiated", body = ExitCaseDetail),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Employee cannot exit or already has an open case"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn initiate_exit(
    auth: AuthActor,
    State(state): State<AppState>,
    Json(body): Json<InitiateExitRequest>,
) -> AppResult<(StatusCode, Json<ExitCaseDetail>)> {
    let detail = ExitLifecycleService::new(&state).initiate(&auth, body).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List exit cases for the caller's company, newest first
#[utoipa::path(
    get,
    path = "/api/v1/exit/cases",
    params(ListCasesQuery),
    responses(
        (status = 200, description = "Page of exit cases", body = ExitCaseList),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn list_exit_cases(
    auth: AuthActor,
    State(state): State<AppState>,
    Query(query): Query<ListCasesQuery>,
) -> AppResult<Json<ExitCaseList>> {
    let list = ExitLifecycleService::new(&state).list(&auth, &query).await?;
    Ok(Json(list))
}

/// Get an exit case with its clearance tasks and settlement
#[utoipa::path(
    get,
    path = "/api/v1/exit/cases/{case_id}",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Exit case detail", body = ExitCaseDetail),
        (status = 404, description = "Exit case not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn get_exit_case(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<ExitCaseDetail>> {
    let detail = ExitLifecycleService::new(&state).detail(&auth, case_id).await?;
    Ok(Json(detail))
}

/// Record exit interview, rehire eligibility and notice figures
#[utoipa::path(
    patch,
    path = "/api/v1/exit/cases/{case_id}",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    request_body = UpdateExitCaseRequest,
    responses(
        (status = 200, description = "Exit case updated", body = ExitCaseDetail),
        (status = 404, description = "Exit case not found"),
        (status = 409, description = "Case is closed or its settlement already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn update_exit_case(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
    Json(body): Json<UpdateExitCaseRequest>,
) -> AppResult<Json<ExitCaseDetail>> {
    let detail = ExitLifecycleService::new(&state)
        .update(&auth, case_id, body)
        .await?;
    Ok(Json(detail))
}

/// Approve the exit, fix the last working day and create the clearance checklist
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/approve",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    request_body = ApproveExitRequest,
    responses(
        (status = 200, description = "Exit approved; clearance pending", body = ExitCaseDetail),
        (status = 400, description = "Last working day is invalid"),
        (status = 409, description = "Case is not awaiting approval"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn approve_exit(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
    Json(body): Json<ApproveExitRequest>,
) -> AppResult<Json<ExitCaseDetail>> {
    let detail = ExitLifecycleService::new(&state)
        .approve(&auth, case_id, body)
        .await?;
    Ok(Json(detail))
}

/// Cancel an open exit case. Cancelling twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/cancel",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    request_body(content = CancelExitRequest, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Exit case cancelled", body = ExitCaseDetail),
        (status = 409, description = "Case is already completed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn cancel_exit(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
    body: Option<Json<CancelExitRequest>>,
) -> AppResult<Json<ExitCaseDetail>> {
    let Json(body) = body.unwrap_or_default();
    let detail = ExitLifecycleService::new(&state)
        .cancel(&auth, case_id, body.reason)
        .await?;
    Ok(Json(detail))
}

/// Close a case whose settlement has been paid
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/complete",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Exit case completed", body = ExitCaseDetail),
        (status = 409, description = "Settlement not paid or case in wrong state"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn complete_exit(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<ExitCaseDetail>> {
    let detail = ExitLifecycleService::new(&state)
        .complete(&auth, case_id)
        .await?;
    Ok(Json(detail))
}

/// List the clearance tasks of a case in checklist order
#[utoipa::path(
    get,
    path = "/api/v1/exit/cases/{case_id}/tasks",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Clearance tasks", body = Vec<ClearanceTask>),
        (status = 404, description = "Exit case not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Clearance"
)]
pub async fn list_case_tasks(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<Vec<ClearanceTask>>> {
    let tasks = ExitLifecycleService::new(&state).tasks(&auth, case_id).await?;
    Ok(Json(tasks))
}

/// Clearance progress recomputed from the task list
#[utoipa::path(
    get,
    path = "/api/v1/exit/cases/{case_id}/progress",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Clearance progress", body = ClearanceProgress),
        (status = 404, description = "Exit case not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Clearance"
)]
pub async fn get_case_progress(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<ClearanceProgress>> {
    let progress = ExitLifecycleService::new(&state)
        .progress(&auth, case_id)
        .await?;
    Ok(Json(progress))
}

/// Case counts per status, plus cases opened this month
#[utoipa::path(
    get,
    path = "/api/v1/exit/stats",
    responses(
        (status = 200, description = "Exit statistics", body = ExitStats),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn get_exit_stats(
    auth: AuthActor,
    State(state): State<AppState>,
) -> AppResult<Json<ExitStats>> {
    let stats = ExitLifecycleService::new(&state).stats(&auth).await?;
    Ok(Json(stats))
}

/// Active employees who have no open exit case
#[utoipa::path(
    get,
    path = "/api/v1/exit/eligible-employees",
    responses(
        (status = 200, description = "Employees eligible for an exit case", body = Vec<EmployeeRecord>),
        (status = 502, description = "Employee directory unavailable"),
    ),
    security(("bearer_auth" = [])),
    tag = "Exit Cases"
)]
pub async fn list_eligible_employees(
    auth: AuthActor,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<EmployeeRecord>>> {
    let employees = ExitLifecycleService::new(&state)
        .eligible_employees(&auth)
        .await?;
    Ok(Json(employees))
}
