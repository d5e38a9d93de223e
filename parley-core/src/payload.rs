//! Provider request body for the OpenAI-style multimodal chat endpoint.
//!
//! Each send is a stateless single-turn request: the envelope carries one
//! `user` turn and never any earlier history, even though the local
//! conversation log keeps it for display.

use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// A single element of a user turn's `content` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// `{"type":"text","text":...}`
    Text { text: String },
    /// `{"type":"image_url","image_url":{"url":...}}` with a base64 data URL.
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image_data(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// One turn in the request's `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// Request body for `POST <endpoint>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
}

impl ChatRequest {
    /// Wrap `content` as the one and only `user` turn.
    pub fn single_turn(model: impl Into<String>, content: Vec<ContentPart>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatTurn {
                role: "user".into(),
                content,
            }],
        }
    }
}

/// Assemble the ordered content parts for a send.
///
/// The text part (when the trimmed input is non-empty) always comes first,
/// followed by the encoded attachment. The text itself is forwarded as typed.
/// Returns [`ChatError::Validation`] rather than an empty sequence.
pub fn build_content(
    text: &str,
    attachment: Option<ContentPart>,
) -> Result<Vec<ContentPart>, ChatError> {
    let mut parts = Vec::with_capacity(2);
    if !text.trim().is_empty() {
        parts.push(ContentPart::text(text));
    }
    parts.extend(attachment);

    if parts.is_empty() {
        return Err(ChatError::Validation);
    }
    Ok(parts)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
