//! Request / response bodies for the conversation and composer endpoints.

use parley_core::{AttachmentMeta, ComposerView, ConversationView, Exchange, Message, Phase, Resolution};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Display metadata of an attached file.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponse {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Inline `data:` URL; present for images only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

/// A single conversation entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    /// Stable list key; not an ordering authority.
    pub id: u64,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentResponse>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// The transient input state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComposerResponse {
    pub text: String,
    pub attachment: Option<AttachmentResponse>,
}

/// Response body for `GET /v1/conversation`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    /// Messages in send order.
    pub messages: Vec<MessageResponse>,
    /// `true` while a send is in flight.
    pub sending: bool,
    /// `"idle"`, `"composing"` or `"sending"`.
    pub phase: String,
    pub composer: ComposerResponse,
}

/// Request body for `PUT /v1/composer/text`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetTextRequest {
    pub text: String,
}

/// Multipart body for `POST /v1/composer/attachment`.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct AttachmentUpload {
    /// The file to attach (images, .pdf, .doc, .docx, .txt).
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Response body for `POST /v1/composer/send`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendResponse {
    pub user: MessageResponse,
    pub reply: MessageResponse,
    /// `"replied"`, `"empty_reply"` or `"failed"`.
    pub resolution: String,
}

// ── Conversions ──────────────────────────────────────────────────────────────

impl From<&AttachmentMeta> for AttachmentResponse {
    fn from(meta: &AttachmentMeta) -> Self {
        Self {
            name: meta.name.clone(),
            mime_type: meta.mime_type.clone(),
            size_bytes: meta.size_bytes,
            preview: meta.preview.clone(),
        }
    }
}

impl From<&Message> for MessageResponse {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.0,
            role: m.role.as_str().to_owned(),
            content: m.content.clone(),
            attachment: m.attachment.as_ref().map(AttachmentResponse::from),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

impl From<ComposerView> for ComposerResponse {
    fn from(view: ComposerView) -> Self {
        Self {
            text: view.text,
            attachment: view.attachment.as_ref().map(AttachmentResponse::from),
        }
    }
}

impl From<ConversationView> for ConversationResponse {
    fn from(view: ConversationView) -> Self {
        Self {
            messages: view.messages.iter().map(|m| MessageResponse::from(m.as_ref())).collect(),
            sending: view.sending,
            phase: phase_name(view.phase).to_owned(),
            composer: view.composer.into(),
        }
    }
}

impl From<Exchange> for SendResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            user: MessageResponse::from(exchange.user.as_ref()),
            reply: MessageResponse::from(exchange.reply.as_ref()),
            resolution: resolution_name(exchange.resolution).to_owned(),
        }
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Composing => "composing",
        Phase::Sending => "sending",
    }
}

fn resolution_name(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::Replied => "replied",
        Resolution::EmptyReply => "empty_reply",
        Resolution::Failed => "failed",
    }
}
