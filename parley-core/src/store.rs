//! Append-only conversation log.
//!
//! Entries are handed out as `Arc<Message>` and there is no API to edit or
//! remove one, so a message is immutable from the moment it is appended.
//! Position in the log is the ordering authority; ids only give the
//! presentation layer a stable key.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Display metadata of a file attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Inline data URL; images only.
    pub preview: Option<String>,
}

/// One conversation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub attachment: Option<AttachmentMeta>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: RwLock<Vec<Arc<Message>>>,
    next_id: AtomicU64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return the stored entry.
    ///
    /// Ids are allocated under the write lock so that id order always matches
    /// log order.
    pub fn append(
        &self,
        role: Role,
        content: impl Into<String>,
        attachment: Option<AttachmentMeta>,
    ) -> Arc<Message> {
        let mut messages = self.messages.write().unwrap_or_else(PoisonError::into_inner);
        let message = Arc::new(Message {
            id: MessageId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            role,
            content: content.into(),
            attachment,
            created_at: Utc::now(),
        });
        messages.push(Arc::clone(&message));
        message
    }

    /// Ordered copy of the log. Cheap: entries are shared, not cloned.
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
