//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use parley_core::{AttachmentPolicy, HttpCompletionClient, Orchestrator, TransportError};

use crate::config::Config;

pub type ChatOrchestrator = Orchestrator<HttpCompletionClient>;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// The single conversation served by this process.
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Limits applied to uploaded attachments.
    pub attachment_policy: AttachmentPolicy,
}

impl AppState {
    /// Build the provider client and orchestrator from `config`.
    pub fn new(config: Config) -> Result<Self, TransportError> {
        let client = HttpCompletionClient::new(&config.provider)?;
        let mut orchestrator = Orchestrator::new(client, config.provider.model.clone());
        if let Some(greeting) = &config.greeting {
            orchestrator = orchestrator.with_greeting(greeting.clone());
        }

        Ok(Self {
            attachment_policy: config.attachment_policy(),
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        })
    }
}
