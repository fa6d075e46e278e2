// src/openapi.rs

use crate::models::{
    ApproveExitRequest, CancelExitRequest, ClearanceDepartment, ClearanceProgress, ClearanceTask,
    ClearanceTaskStatus, EmployeeRecord, EmploymentStatus, ExitCase, ExitCaseDetail, ExitCaseList,
    ExitCaseStatus, ExitStats, ExitType, FinalSettlement, InitiateExitRequest, PageMeta,
    RecordPaymentRequest, ResolveTaskRequest, SettlementAdjustments, SettlementResponse,
    SettlementStatus, StartTaskRequest, UpdateExitCaseRequest,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Exit Case Engine",
        version = "0.1.0",
        description = "Employee offboarding API. Tracks an exit from initiation through \
            approval, departmental clearance, full-and-final settlement and closure. \
            Tokens are issued by the session service and verified here.",
        license(name = "MIT")
    ),
    paths(
        // Exit cases
        crate::handlers::exit_case::initiate_exit,
        crate::handlers::exit_case::list_exit_cases,
        crate::handlers::exit_case::get_exit_case,
        crate::handlers::exit_case::update_exit_case,
        crate::handlers::exit_case::approve_exit,
        crate::handlers::exit_case::cancel_exit,
        crate::handlers::exit_case::complete_exit,
        crate::handlers::exit_case::get_exit_stats,
        crate::handlers::exit_case::list_eligible_employees,
        // Clearance
        crate::handlers::exit_case::list_case_tasks,
        crate::handlers::exit_case::get_case_progress,
        crate::handlers::clearance::start_task,
        crate::handlers::clearance::complete_task,
        crate::handlers::clearance::resolve_task,
        // Settlement
        crate::handlers::settlement::calculate_settlement,
        crate::handlers::settlement::get_settlement,
        crate::handlers::settlement::approve_settlement,
        crate::handlers::settlement::process_settlement,
        crate::handlers::settlement::record_payment,
    ),
    components(
        schemas(
            ExitType, ExitCaseStatus, ExitCase, ExitCaseDetail, ExitCaseList, PageMeta, ExitStats,
            InitiateExitRequest, ApproveExitRequest, CancelExitRequest, UpdateExitCaseRequest,
            ClearanceDepartment, ClearanceTaskStatus, ClearanceTask, ClearanceProgress,
            StartTaskRequest, ResolveTaskRequest,
            SettlementStatus, FinalSettlement, SettlementAdjustments, SettlementResponse,
            RecordPaymentRequest,
            EmploymentStatus, EmployeeRecord,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Exit Cases", description = "Initiate, approve, cancel and close exits"),
        (name = "Clearance", description = "Departmental clearance checklists"),
        (name = "Settlement", description = "Full-and-final settlement calculation and payment"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_exit_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/exit/cases",
            "/api/v1/exit/cases/{case_id}/approve",
            "/api/v1/exit/tasks/{task_id}/resolve",
            "/api/v1/exit/cases/{case_id}/settlement/pay",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
