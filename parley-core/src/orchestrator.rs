use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::attachment::{self, PendingAttachment};
use crate::error::ChatError;
use crate::payload::{build_content, ChatRequest};
use crate::provider::CompletionClient;
use crate::store::{AttachmentMeta, ConversationStore, Message, Role};

/// Assistant text used when the provider answers without any reply content.
pub const EMPTY_REPLY_NOTICE: &str = "No reply was returned.";

/// Prefix of assistant messages that report a failed send.
pub const ERROR_PREFIX: &str = "Error: ";

pub const DEFAULT_GREETING: &str =
    "Hello! I'm your AI assistant. Upload an image or a file, or just ask a question.";

/// Coarse lifecycle position, as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing typed, nothing attached.
    Idle,
    /// Input text or an attachment is pending.
    Composing,
    /// A send is in flight.
    Sending,
}

/// How a completed send cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The provider returned reply text.
    Replied,
    /// The provider succeeded but returned nothing usable.
    EmptyReply,
    /// Encoding or transport failed; the reply is an error message.
    Failed,
}

/// The user/assistant pair appended by one send cycle.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user: Arc<Message>,
    pub reply: Arc<Message>,
    pub resolution: Resolution,
}

#[derive(Debug)]
pub enum SendOutcome {
    /// Nothing to send. Input and attachment were left untouched.
    Rejected(ChatError),
    /// Another send is in flight; this call had no effect.
    Busy,
    Completed(Exchange),
}

/// Read-only view of the transient input state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerView {
    pub text: String,
    pub attachment: Option<AttachmentMeta>,
}

impl ComposerView {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone)]
pub struct ConversationView {
    pub messages: Vec<Arc<Message>>,
    pub sending: bool,
    pub phase: Phase,
    pub composer: ComposerView,
}

#[derive(Debug, Default)]
struct Composer {
    text: String,
    attachment: Option<PendingAttachment>,
}

impl Composer {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}

/// Held for the whole `Sending` phase. Dropping it resets the composer and
/// then frees the admission permit, whatever way the send ended.
struct SendingGuard<'a> {
    composer: &'a Mutex<Composer>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        let previous = std::mem::take(
            &mut *self.composer.lock().unwrap_or_else(PoisonError::into_inner),
        );
        drop(previous);
    }
}

/// Drives the send lifecycle for a single conversation.
///
/// ```text
/// Idle ⇄ Composing ─send()→ Sending ─→ Resolved | Failed ─→ Idle
/// ```
///
/// At most one send is in flight; the guard is a one-permit semaphore so a
/// concurrent `send()` fails fast with [`SendOutcome::Busy`] instead of
/// queueing. The user message is appended before the provider call starts
/// and the assistant message after it resolves, so log order always matches
/// send chronology.
#[derive(Debug)]
pub struct Orchestrator<C> {
    client: C,
    model: String,
    store: ConversationStore,
    composer: Mutex<Composer>,
    admission: Arc<Semaphore>,
}

impl<C: CompletionClient> Orchestrator<C> {
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            store: ConversationStore::new(),
            composer: Mutex::new(Composer::default()),
            admission: Arc::new(Semaphore::new(1)),
        }
    }

    /// Seed the log with an assistant greeting.
    pub fn with_greeting(self, greeting: impl Into<String>) -> Self {
        self.store.append(Role::Assistant, greeting, None);
        self
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn set_input_text(&self, text: impl Into<String>) {
        self.lock_composer().text = text.into();
    }

    /// Make `attachment` the pending one. A previously pending attachment is
    /// discarded and its spool file removed.
    pub fn select_attachment(&self, attachment: PendingAttachment) {
        let previous = self.lock_composer().attachment.replace(attachment);
        if let Some(previous) = previous {
            debug!(name = %previous.name(), "replacing pending attachment");
        }
    }

    /// Drop the pending attachment. Returns `false` if there was none.
    pub fn clear_attachment(&self) -> bool {
        let previous = self.lock_composer().attachment.take();
        previous.is_some()
    }

    pub fn composer(&self) -> ComposerView {
        let composer = self.lock_composer();
        ComposerView {
            text: composer.text.clone(),
            attachment: composer.attachment.as_ref().map(PendingAttachment::meta),
        }
    }

    pub fn is_sending(&self) -> bool {
        self.admission.available_permits() == 0
    }

    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    pub fn snapshot(&self) -> ConversationView {
        let sending = self.is_sending();
        let composer = self.composer();
        let phase = if sending {
            Phase::Sending
        } else if composer.is_blank() {
            Phase::Idle
        } else {
            Phase::Composing
        };

        ConversationView {
            messages: self.store.snapshot(),
            sending,
            phase,
            composer,
        }
    }

    /// Run one send cycle to completion.
    ///
    /// Every failure after validation is converted into an assistant message;
    /// the returned [`Exchange`] says which way it went.
    pub async fn send(&self) -> SendOutcome {
        let Ok(permit) = Arc::clone(&self.admission).try_acquire_owned() else {
            debug!("send ignored: another send is in flight");
            return SendOutcome::Busy;
        };

        let (text, attachment) = {
            let mut composer = self.lock_composer();
            if composer.is_blank() {
                debug!("send rejected: no text and no attachment");
                return SendOutcome::Rejected(ChatError::Validation);
            }
            (std::mem::take(&mut composer.text), composer.attachment.take())
        };
        let _sending = SendingGuard {
            composer: &self.composer,
            _permit: permit,
        };

        let user = self.store.append(
            Role::User,
            text.as_str(),
            attachment.as_ref().map(PendingAttachment::meta),
        );
        info!(
            message_id = %user.id,
            text_len = text.len(),
            attachment = attachment.as_ref().map(|a| a.name()),
            "user turn appended"
        );

        let (content, resolution) = match self.exchange(&text, attachment.as_ref()).await {
            Ok(Some(reply)) => (reply, Resolution::Replied),
            Ok(None) => {
                warn!(message_id = %user.id, "provider returned no reply content");
                (EMPTY_REPLY_NOTICE.to_owned(), Resolution::EmptyReply)
            }
            Err(e) => {
                warn!(message_id = %user.id, error = %e, "send failed");
                (format!("{ERROR_PREFIX}{e}"), Resolution::Failed)
            }
        };

        let reply = self.store.append(Role::Assistant, content, None);
        info!(message_id = %reply.id, ?resolution, "assistant turn appended");

        SendOutcome::Completed(Exchange {
            user,
            reply,
            resolution,
        })
    }

    /// Encode → build → dispatch.
    async fn exchange(
        &self,
        text: &str,
        attachment: Option<&PendingAttachment>,
    ) -> Result<Option<String>, ChatError> {
        let attachment_part = match attachment {
            Some(pending) => Some(attachment::encode(pending).await?),
            None => None,
        };
        let content = build_content(text, attachment_part)?;
        debug!(parts = content.len(), "payload built");

        let request = ChatRequest::single_turn(&self.model, content);
        Ok(self.client.complete(&request).await?)
    }

    fn lock_composer(&self) -> MutexGuard<'_, Composer> {
        self.composer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
