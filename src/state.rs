use crate::{config::Config, services::directory::EmployeeDirectory};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub directory: Arc<dyn EmployeeDirectory>,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>, directory: Arc<dyn EmployeeDirectory>) -> Self {
        Self {
            db,
            config,
            directory,
        }
    }
}
