//! Message composition and request orchestration for a multimodal chat relay.
//!
//! The [`Orchestrator`] owns the conversation log and the pending input, and
//! turns each send into a single-turn request against a
//! [`CompletionClient`].

pub mod attachment;
pub mod payload;
pub mod provider;
pub mod store;

mod error;
mod orchestrator;

pub use attachment::{AttachmentPolicy, PendingAttachment};
pub use error::{AttachmentError, ChatError, TransportError};
pub use orchestrator::{
    ComposerView, ConversationView, Exchange, Orchestrator, Phase, Resolution, SendOutcome,
    DEFAULT_GREETING, EMPTY_REPLY_NOTICE, ERROR_PREFIX,
};
pub use payload::{ChatRequest, ContentPart};
pub use provider::{CompletionClient, HttpCompletionClient, ProviderConfig};
pub use store::{AttachmentMeta, ConversationStore, Message, MessageId, Role};
