// src/routes/mod.rs

use crate::{
    handlers::{
        clearance::{complete_task, resolve_task, start_task},
        exit_case::{
            approve_exit, cancel_exit, complete_exit, get_case_progress, get_exit_case,
            get_exit_stats, initiate_exit, list_case_tasks, list_eligible_employees,
            list_exit_cases, update_exit_case,
        },
        settlement::{
            approve_settlement, calculate_settlement, get_settlement, process_settlement,
            record_payment,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Exit Cases ───────────────────────────────────────
        .route("/exit/cases", post(initiate_exit).get(list_exit_cases))
        .route(
            "/exit/cases/{case_id}",
            get(get_exit_case).patch(update_exit_case),
        )
        .route("/exit/cases/{case_id}/approve", post(approve_exit))
        .route("/exit/cases/{case_id}/cancel", post(cancel_exit))
        .route("/exit/cases/{case_id}/complete", post(complete_exit))
        .route("/exit/stats", get(get_exit_stats))
        .route("/exit/eligible-employees", get(list_eligible_employees))
        // ─── Clearance ────────────────────────────────────────
        .route("/exit/cases/{case_id}/tasks", get(list_case_tasks))
        .route("/exit/cases/{case_id}/progress", get(get_case_progress))
        .route("/exit/tasks/{task_id}/start", post(start_task))
        .route("/exit/tasks/{task_id}/complete", post(complete_task))
        .route("/exit/tasks/{task_id}/resolve", post(resolve_task))
        // ─── Settlement ───────────────────────────────────────
        .route("/exit/cases/{case_id}/settlement", get(get_settlement))
        .route(
            "/exit/cases/{case_id}/settlement/calculate",
            post(calculate_settlement),
        )
        .route(
            "/exit/cases/{case_id}/settlement/approve",
            post(approve_settlement),
        )
        .route(
            "/exit/cases/{case_id}/settlement/process",
            post(process_settlement),
        )
        .route("/exit/cases/{case_id}/settlement/pay", post(record_payment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::tests::test_config, services::directory::tests::FakeDirectory};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    // The pool is lazy, so requests rejected before any query never touch a database.
    fn app() -> Router {
        let config = Arc::new(test_config());
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let state = AppState::new(db, config, Arc::new(FakeDirectory::default()));
        Router::new().nest("/api/v1", api_routes()).with_state(state)
    }

    async fn error_kind(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        json["error"]["kind"].clone()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/exit/cases")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/exit/tasks/7b1e9a1e-3a56-4a5e-9d2c-1f0e6a3c2b11/complete")
                    .header("Authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_kind(response).await, "invalid_token");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::get("/api/v1/exits").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
