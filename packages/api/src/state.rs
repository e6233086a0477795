// ABOUTME: Shared state handed to every handler
// ABOUTME: Database access, the generation orchestrator, and webhook configuration

use std::sync::Arc;

use prdsmith_ideate::GenerationOrchestrator;
use prdsmith_storage::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub orchestrator: Arc<GenerationOrchestrator>,
    /// Signing secret of the account-sync webhook; the endpoint is disabled without it
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<GenerationOrchestrator>) -> Self {
        Self {
            db: orchestrator.database().clone(),
            orchestrator,
            webhook_secret: None,
        }
    }

    pub fn with_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.webhook_secret = secret.map(Arc::from);
        self
    }
}
