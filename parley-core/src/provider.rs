//! Client for the remote multimodal chat-completion endpoint.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::payload::ChatRequest;

/// Static provider settings, injected once at construction.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Full chat-completions URL, e.g. `https://host/api/v3/chat/completions`.
    pub endpoint: String,
    pub api_key: String,
    /// Opaque model identifier forwarded in every request.
    pub model: String,
    /// Per-request timeout. `None` leaves the transport default in place,
    /// which never times out.
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Performs one chat-completion exchange.
///
/// `Ok(None)` means the provider answered successfully but without any usable
/// reply text.
pub trait CompletionClient: Send + Sync + 'static {
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}

/// [`CompletionClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpCompletionClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, TransportError> {
        debug!(endpoint = %self.endpoint, model = %request.model, "dispatching chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = error_message(&body);
            warn!(status = status.as_u16(), message = ?message, "provider rejected request");
            return Err(TransportError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = serde_json::from_slice(&body)?;
        Ok(completion.into_reply())
    }
}

// ── Response bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl CompletionResponse {
    /// `choices[0].message.content`, if it holds anything but whitespace.
    fn into_reply(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
    }
}

/// Best-effort `error.message` extraction. Also accepts a bare
/// `{"error": "..."}` string; anything else yields `None`.
fn error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_owned)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
