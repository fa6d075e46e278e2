use crate::models::ClearanceDepartment;
use anyhow::{Context, anyhow, bail};
use dotenvy::dotenv;
use std::{env, str::FromStr};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub directory_base_url: String,
    pub directory_api_key: String,
    pub directory_secret: String,
    pub default_notice_period_days: i32,
    /// Departments whose checklist is spawned on approval, in this order
    pub clearance_departments: Vec<ClearanceDepartment>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{} must be set", key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let notice_days: i32 = parse(&or_default("DEFAULT_NOTICE_PERIOD_DAYS", "30"))
            .context("DEFAULT_NOTICE_PERIOD_DAYS must be a number")?;
        if notice_days < 0 {
            bail!("DEFAULT_NOTICE_PERIOD_DAYS cannot be negative");
        }

        Ok(Self {
            server_host: or_default("SERVER_HOST", "127.0.0.1"),
            server_port: parse(&or_default("SERVER_PORT", "3000"))
                .context("SERVER_PORT must be a valid port number")?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: parse(&or_default("DATABASE_MAX_CONNECTIONS", "20"))
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            jwt_secret: required("JWT_SECRET")?,
            directory_base_url: required("EMPLOYEE_DIRECTORY_URL")?,
            directory_api_key: required("EMPLOYEE_DIRECTORY_API_KEY")?,
            directory_secret: required("EMPLOYEE_DIRECTORY_SECRET")?,
            default_notice_period_days: notice_days,
            clearance_departments: parse_departments(&or_default(
                "CLEARANCE_DEPARTMENTS",
                "it,hr,finance,admin,manager",
            ))?,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse<T: FromStr>(value: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(value.trim().parse::<T>()?)
}

fn parse_departments(value: &str) -> anyhow::Result<Vec<ClearanceDepartment>> {
    let mut departments = Vec::new();
    for name in value.split(',').filter(|s| !s.trim().is_empty()) {
        let department = name
            .parse::<ClearanceDepartment>()
            .map_err(|e| anyhow!("CLEARANCE_DEPARTMENTS: {}", e))?;
        if !departments.contains(&department) {
            departments.push(department);
        }
    }
    if departments.is_empty() {
        bail!("CLEARANCE_DEPARTMENTS must name at least one department");
    }
    Ok(departments)
}
