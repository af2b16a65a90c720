use crate::config::AppConfig;
use crate::services::llm_provider::ChatBackend;
use crate::services::secrets::SecretStore;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    pub chat: Arc<dyn ChatBackend>,
    pub secrets: Arc<SecretStore>,
}

impl AppState {
    pub fn new(config: AppConfig, chat: Arc<dyn ChatBackend>, secrets: SecretStore) -> Self {
        let sessions = SessionStore::new(config.sessions.idle_ttl());
        Self {
            config: Arc::new(config),
            sessions,
            chat,
            secrets: Arc::new(secrets),
        }
    }
}
