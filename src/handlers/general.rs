use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use serde_json::json;

/// Landing page with links to the docs and a route overview
pub async fn root_handler() -> impl IntoResponse {
    Html(LANDING_PAGE)
}

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0"/>
  <title>Exit Case Engine</title>
  <style>
    body { font: 15px/1.6 Georgia, 'Times New Roman', serif; color: #222; background: #fbfaf7; max-width: 760px; margin: 3em auto; padding: 0 1em; }
    h1 { font-weight: normal; border-bottom: 3px double #999; padding-bottom: .2em; }
    h2 { font-size: 1.05em; font-variant: small-caps; letter-spacing: .05em; margin-top: 2em; }
    a { color: #8a2c0d; }
    table { width: 100%; border-collapse: collapse; font-size: .9em; }
    td { padding: .3em .5em; border-top: 1px dotted #bbb; vertical-align: top; }
    td:first-child { width: 4.5em; font: bold .8em monospace; color: #555; }
    code { font-size: .95em; }
    .muted { color: #777; font-size: .85em; }
  </style>
</head>
<body>
  <h1>Exit Case Engine</h1>
  <p>Employee offboarding: exit approval, departmental clearance and full-and-final settlement.</p>
  <p><a href="/docs">Swagger UI</a> &middot; <a href="/health">Health</a> &middot; <a href="/api-docs/openapi.json">OpenAPI JSON</a></p>
  <p class="muted">Approving an exit creates IT, HR, Finance, Admin and Manager checklists.
  Once every task is resolved the settlement (salary dues, leave encashment, notice and asset recovery)
  is calculated, approved, processed and paid before the case is closed.</p>

  <h2>Exit cases</h2>
  <table>
    <tr><td>POST</td><td><code>/api/v1/exit/cases</code></td><td>Initiate an exit</td></tr>
    <tr><td>GET</td><td><code>/api/v1/exit/cases</code></td><td>List cases (page, limit, status)</td></tr>
    <tr><td>GET</td><td><code>/api/v1/exit/cases/{id}</code></td><td>Case with tasks and settlement</td></tr>
    <tr><td>PATCH</td><td><code>/api/v1/exit/cases/{id}</code></td><td>Exit interview, rehire and notice details</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/approve</code></td><td>Approve with a last working day</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/cancel</code></td><td>Cancel an open case</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/complete</code></td><td>Close after payment</td></tr>
    <tr><td>GET</td><td><code>/api/v1/exit/stats</code></td><td>Counts per status</td></tr>
    <tr><td>GET</td><td><code>/api/v1/exit/eligible-employees</code></td><td>Employees without an open case</td></tr>
  </table>

  <h2>Clearance</h2>
  <table>
    <tr><td>GET</td><td><code>/api/v1/exit/cases/{id}/tasks</code></td><td>Checklist in order</td></tr>
    <tr><td>GET</td><td><code>/api/v1/exit/cases/{id}/progress</code></td><td>Clearance progress</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/tasks/{id}/start</code></td><td>Start a task</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/tasks/{id}/complete</code></td><td>Mark a task cleared</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/tasks/{id}/resolve</code></td><td>Clear or mark not applicable</td></tr>
  </table>

  <h2>Settlement</h2>
  <table>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/settlement/calculate</code></td><td>Calculate or recalculate</td></tr>
    <tr><td>GET</td><td><code>/api/v1/exit/cases/{id}/settlement</code></td><td>Settlement detail</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/settlement/approve</code></td><td>Approve</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/settlement/process</code></td><td>Hand to payroll</td></tr>
    <tr><td>POST</td><td><code>/api/v1/exit/cases/{id}/settlement/pay</code></td><td>Record payment</td></tr>
  </table>
</body>
</html>"#;

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "service": "exit-case-engine",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}
