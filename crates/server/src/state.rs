//! Shared server state.

use std::sync::Arc;

use hearth_client::{AuthContext, FetchClient, FetchConfig, Orchestrator, OrchestratorSettings};
use hearth_core::{AppConfig, CacheDb};

/// Everything a tool call can reach.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub session: Arc<AuthContext>,
}

impl AppState {
    /// Wire the orchestrator, network client and auth session from config.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let db = CacheDb::open(&config.db_path).await?;
        Self::with_db(db, config)
    }

    pub fn with_db(db: CacheDb, config: &AppConfig) -> anyhow::Result<Self> {
        let fetcher = FetchClient::new(FetchConfig::from(config))?;
        let settings = OrchestratorSettings::from_config(config)?;
        let session = Arc::new(AuthContext::new());
        let orchestrator = Orchestrator::new(db, Arc::new(fetcher), settings).with_session(Arc::clone(&session));

        Ok(Self { orchestrator, session })
    }
}
