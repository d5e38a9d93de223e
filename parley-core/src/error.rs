use thiserror::Error;

/// Errors produced while talking to the remote chat-completion endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced a response (DNS, TLS, connection reset,
    /// timeout) or the response body could not be read.
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("{}", describe_status(*status, message.as_deref()))]
    Status {
        status: u16,
        /// `error.message` from the response body, when it had that shape.
        message: Option<String>,
    },

    /// A 2xx response whose body was not a chat-completion object.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

fn describe_status(status: u16, message: Option<&str>) -> String {
    match message {
        Some(m) => format!("request failed with status {status}: {m}"),
        None => format!("request failed with status {status}"),
    }
}

/// Errors that can end a send cycle.
///
/// Inside [`crate::Orchestrator::send`] every variant except
/// [`ChatError::Validation`] is turned into an assistant message; callers only
/// ever observe `Validation` directly.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Send attempted with no text and no attachment.
    #[error("nothing to send: the message text and attachment are both empty")]
    Validation,

    /// The spooled attachment could not be read back for encoding.
    #[error("could not read attachment '{name}': {source}")]
    AttachmentRead {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised when a file is offered as the pending attachment.
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("unsupported attachment '{name}' ({mime_type}); accepted: images, .pdf, .doc, .docx, .txt")]
    Unsupported { name: String, mime_type: String },

    #[error("attachment too large: {size} bytes exceeds the maximum of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// Writing the upload to the spool directory failed.
    #[error("failed to spool attachment: {0}")]
    Spool(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_error_includes_body_message_when_present() {
        let err = TransportError::Status {
            status: 401,
            message: Some("invalid api key".into()),
        };
        assert_eq!(err.to_string(), "request failed with status 401: invalid api key");
    }

    #[test]
    fn status_error_without_body_message_stays_generic() {
        let err = TransportError::Status { status: 502, message: None };
        assert_eq!(err.to_string(), "request failed with status 502");
    }

    #[test]
    fn transport_error_is_transparent_inside_chat_error() {
        let err = ChatError::from(TransportError::Status { status: 500, message: None });
        assert_eq!(err.to_string(), "request failed with status 500");
    }
}
