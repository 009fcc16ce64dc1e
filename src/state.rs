use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, middleware::auth::JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, config: AppConfig) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt_secret, config.jwt_expire_hours));
        Self {
            orm,
            config: Arc::new(config),
            jwt,
        }
    }
}
