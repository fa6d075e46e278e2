// src/services/directory.rs

use crate::{
    config::Config,
    errors::{AppError, ExitError},
    models::{EmployeeCompensation, EmployeeRecord},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tracing::{debug, error};
use uuid::Uuid;

/// Read-only view of the employee directory and payroll records.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn employee(&self, employee_id: Uuid) -> Result<EmployeeRecord, AppError>;

    async fn compensation(&self, employee_id: Uuid) -> Result<EmployeeCompensation, AppError>;

    /// Employees who can still be offboarded: active and probationary.
    async fn current_employees(&self) -> Result<Vec<EmployeeRecord>, AppError>;
}

#[derive(Clone)]
pub struct HttpEmployeeDirectory {
    client: Client,
    config: Arc<Config>,
}

#[derive(Debug, serde::Deserialize)]
struct EmployeeListResponse {
    data: Vec<EmployeeRecord>,
}

impl HttpEmployeeDirectory {
    pub fn new(config: Arc<Config>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Directory(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn authorization(&self) -> String {
        let credentials = format!(
            "{}:{}",
            self.config.directory_api_key, self.config.directory_secret
        );
        format!("Basic {}", general_purpose::STANDARD.encode(credentials))
    }

    /// GET `{base}{path}`; `Ok(None)` when the directory answers 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, AppError> {
        let url = format!(
            "{}{}",
            self.config.directory_base_url.trim_end_matches('/'),
            path
        );
        debug!("Employee directory request: GET {}", url);

        let resp = self
            .client
            .get(&url)
            .query(query)
            .header("Authorization", self.authorization())
            .send()
            .await
            .map_err(|e| {
                error!("Employee directory unreachable: {}", e);
                AppError::Directory(e.to_string())
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp
                .json::<T>()
                .await
                .map(Some)
                .map_err(|e| AppError::Directory(format!("Malformed directory response: {}", e))),
            status => {
                let body = resp.text().await.unwrap_or_default();
                error!("Employee directory returned {}: {}", status, body);
                Err(AppError::Directory(format!(
                    "Directory returned {} for {}",
                    status, path
                )))
            }
        }
    }
}

fn not_in_directory(employee_id: Uuid) -> AppError {
    ExitError::InvalidEmployeeState {
        employee_id,
        reason: "employee not found in directory".to_string(),
    }
    .into()
}

#[async_trait]
impl EmployeeDirectory for HttpEmployeeDirectory {
    async fn employee(&self, employee_id: Uuid) -> Result<EmployeeRecord, AppError> {
        self.get_json(&format!("/employees/{}", employee_id), &[])
            .await?
            .ok_or_else(|| not_in_directory(employee_id))
    }

    async fn compensation(&self, employee_id: Uuid) -> Result<EmployeeCompensation, AppError> {
        self.get_json(&format!("/employees/{}/compensation", employee_id), &[])
            .await?
            .ok_or_else(|| not_in_directory(employee_id))
    }

    async fn current_employees(&self) -> Result<Vec<EmployeeRecord>, AppError> {
        let mut roster = Vec::new();
        for status in ["active", "probation"] {
            let list: Option<EmployeeListResponse> = self
                .get_json("/employees", &[("status", status)])
                .await?;
            roster.extend(list.map(|l| l.data).unwrap_or_default());
        }
        Ok(roster)
    }
}
