use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::security::jwt::IdentityVerifier;

pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub verifier: Arc<IdentityVerifier>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig) -> anyhow::Result<Self> {
        let verifier = Arc::new(IdentityVerifier::new(&config.auth)?);
        Ok(Self {
            conn,
            config,
            verifier,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pool = self.conn.state();
        f.debug_struct("AppState")
            .field("pool_connections", &pool.connections)
            .field("pool_idle", &pool.idle_connections)
            .field("config", &self.config)
            .field("verifier", &self.verifier)
            .finish()
    }
}
