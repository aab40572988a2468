use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub postgres: PgPool,
    pub config: Arc<AppConfig>,
}
