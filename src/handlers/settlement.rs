// src/handlers/settlement.rs

use crate::{
    auth::AuthActor,
    errors::AppResult,
    models::{FinalSettlement, RecordPaymentRequest, SettlementAdjustments, SettlementResponse},
    services::lifecycle::ExitLifecycleService,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

/// Calculate the full-and-final settlement once clearance is complete.
/// Set `recalculate` to overwrite an existing settlement.
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/settlement/calculate",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    request_body(content = SettlementAdjustments, description = "Manual earnings and deductions"),
    responses(
        (status = 200, description = "Settlement calculated", body = SettlementResponse),
        (status = 400, description = "Negative amount supplied"),
        (status = 409, description = "Clearance incomplete or settlement already calculated"),
        (status = 502, description = "Employee directory unavailable"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlement"
)]
pub async fn calculate_settlement(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
    body: Option<Json<SettlementAdjustments>>,
) -> AppResult<Json<SettlementResponse>> {
    let Json(adjustments) = body.unwrap_or_default();
    let response = ExitLifecycleService::new(&state)
        .calculate_settlement(&auth, case_id, adjustments)
        .await?;
    Ok(Json(response))
}

/// Get the settlement of an exit case
#[utoipa::path(
    get,
    path = "/api/v1/exit/cases/{case_id}/settlement",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Settlement", body = FinalSettlement),
        (status = 404, description = "Case or settlement not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlement"
)]
pub async fn get_settlement(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<FinalSettlement>> {
    let settlement = ExitLifecycleService::new(&state)
        .settlement(&auth, case_id)
        .await?;
    Ok(Json(settlement))
}

/// Approve a calculated settlement
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/settlement/approve",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Settlement approved", body = SettlementResponse),
        (status = 404, description = "Case or settlement not found"),
        (status = 409, description = "Settlement is not awaiting approval"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlement"
)]
pub async fn approve_settlement(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<SettlementResponse>> {
    let response = ExitLifecycleService::new(&state)
        .approve_settlement(&auth, case_id)
        .await?;
    Ok(Json(response))
}

/// Hand an approved settlement to payroll; the case moves to F&F processed
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/settlement/process",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    responses(
        (status = 200, description = "Settlement processed", body = SettlementResponse),
        (status = 404, description = "Case or settlement not found"),
        (status = 409, description = "Settlement is not approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlement"
)]
pub async fn process_settlement(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
) -> AppResult<Json<SettlementResponse>> {
    let response = ExitLifecycleService::new(&state)
        .process_settlement(&auth, case_id)
        .await?;
    Ok(Json(response))
}

/// Record the payment of a processed settlement
#[utoipa::path(
    post,
    path = "/api/v1/exit/cases/{case_id}/settlement/pay",
    params(("case_id" = Uuid, Path, description = "Exit case ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = SettlementResponse),
        (status = 400, description = "Blank payment reference"),
        (status = 409, description = "Settlement is not processed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlement"
)]
pub async fn record_payment(
    auth: AuthActor,
    State(state): State<AppState>,
    Path(case_id): Path<Uuid>,
    Json(body): Json<RecordPaymentRequest>,
) -> AppResult<Json<SettlementResponse>> {
    let response = ExitLifecycleService::new(&state)
        .record_payment(&auth, case_id, body)
        .await?;
    Ok(Json(response))
}
