// src/errors.rs

use crate::models::{ClearanceTaskStatus, ExitCaseStatus, SettlementStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Rule violations raised by the exit case state machine, clearance tracker
/// and settlement calculator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExitError {
    #[error("Employee {employee_id} cannot be offboarded: {reason}")]
    InvalidEmployeeState { employee_id: Uuid, reason: String },

    #[error("Cannot {action} an exit case in state '{from}'")]
    InvalidTransition {
        from: ExitCaseStatus,
        action: &'static str,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Clearance task {0} not found")]
    TaskNotFound(Uuid),

    #[error("Clearance task {task_id} is already {status}")]
    TaskAlreadyResolved {
        task_id: Uuid,
        status: ClearanceTaskStatus,
    },

    #[error("A task can only be resolved as cleared or not_applicable, not {0}")]
    InvalidResolution(ClearanceTaskStatus),

    #[error("Invalid amount for {field}: {value} (negative or too large to store)")]
    InvalidAmount { field: &'static str, value: Decimal },

    #[error("Exit case {0} not found")]
    CaseNotFound(Uuid),

    #[error("No final settlement has been calculated for exit case {0}")]
    SettlementNotFound(Uuid),

    #[error("A final settlement already exists for exit case {0}; request a recalculation")]
    SettlementAlreadyCalculated(Uuid),

    #[error("Settlement is '{found}', expected '{expected}'")]
    InvalidSettlementState {
        found: SettlementStatus,
        expected: SettlementStatus,
    },

    #[error("Exit case {0} cannot be completed before its settlement is paid")]
    SettlementNotPaid(Uuid),
}

impl ExitError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExitError::InvalidDate(_)
            | ExitError::InvalidResolution(_)
            | ExitError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
            ExitError::TaskNotFound(_)
            | ExitError::CaseNotFound(_)
            | ExitError::SettlementNotFound(_) => StatusCode::NOT_FOUND,
            ExitError::InvalidEmployeeState { .. }
            | ExitError::InvalidTransition { .. }
            | ExitError::TaskAlreadyResolved { .. }
            | ExitError::SettlementAlreadyCalculated(_)
            | ExitError::InvalidSettlementState { .. }
            | ExitError::SettlementNotPaid(_) => StatusCode::CONFLICT,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ExitError::InvalidEmployeeState { .. } => "invalid_employee_state",
            ExitError::InvalidTransition { .. } => "invalid_transition",
            ExitError::InvalidDate(_) => "invalid_date",
            ExitError::TaskNotFound(_) => "task_not_found",
            ExitError::TaskAlreadyResolved { .. } => "task_already_resolved",
            ExitError::InvalidResolution(_) => "invalid_resolution",
            ExitError::InvalidAmount { .. } => "invalid_amount",
            ExitError::CaseNotFound(_) => "case_not_found",
            ExitError::SettlementNotFound(_) => "settlement_not_found",
            ExitError::SettlementAlreadyCalculated(_) => "settlement_already_calculated",
            ExitError::InvalidSettlementState { .. } => "invalid_settlement_state",
            ExitError::SettlementNotPaid(_) => "settlement_not_paid",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Exit(#[from] ExitError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Auth errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token")]
    InvalidToken,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // External service errors
    #[error("Employee directory error: {0}")]
    Directory(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Exit(e) => e.status_code(),
            AppError::Unauthorized(_) | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Directory(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Exit(e) => e.kind(),
            AppError::Database(_) => "database_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::Validation(_) => "validation_error",
            AppError::Directory(_) => "directory_error",
        }
    }

    /// Postgres unique violation (SQLSTATE 23505)
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| code == "23505")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

// Convenience alias
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_errors_map_to_documented_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (
                ExitError::InvalidEmployeeState { employee_id: id, reason: "exited".into() },
                StatusCode::CONFLICT,
            ),
            (
                ExitError::InvalidTransition { from: ExitCaseStatus::Completed, action: "approve" },
                StatusCode::CONFLICT,
            ),
            (ExitError::InvalidDate("before resignation".into()), StatusCode::BAD_REQUEST),
            (ExitError::TaskNotFound(id), StatusCode::NOT_FOUND),
            (
                ExitError::TaskAlreadyResolved { task_id: id, status: ClearanceTaskStatus::Cleared },
                StatusCode::CONFLICT,
            ),
            (
                ExitError::InvalidAmount { field: "bonus_dues", value: Decimal::NEGATIVE_ONE },
                StatusCode::BAD_REQUEST,
            ),
            (ExitError::SettlementNotPaid(id), StatusCode::CONFLICT),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_transition_error_message_names_state() {
        let err = ExitError::InvalidTransition {
            from: ExitCaseStatus::ClearancePending,
            action: "approve",
        };
        assert_eq!(
            err.to_string(),
            "Cannot approve an exit case in state 'clearance_pending'"
        );
        assert_eq!(err.kind(), "invalid_transition");
    }

    #[test]
    fn test_directory_errors_are_bad_gateway() {
        let err = AppError::Directory("connection refused".into());
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.kind(), "directory_error");
    }
}
