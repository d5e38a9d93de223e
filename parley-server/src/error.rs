//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! Failures of a send cycle itself never reach this type: the orchestrator
//! records them as assistant messages. What remains are rejected intents and
//! internal faults. Internal errors are logged with full detail but only a
//! generic message is returned to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_core::AttachmentError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The uploaded attachment exceeds the configured limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// The intent conflicts with the current state (a send is in flight).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            ServerError::Conflict(m) => (StatusCode::CONFLICT, m),

            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<AttachmentError> for ServerError {
    fn from(e: AttachmentError) -> Self {
        match e {
            AttachmentError::Unsupported { .. } => ServerError::BadRequest(e.to_string()),
            AttachmentError::TooLarge { .. } => ServerError::PayloadTooLarge(e.to_string()),
            AttachmentError::Spool(ref io) => {
                error!(error = %io, "failed to spool attachment");
                ServerError::Internal(e.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!(error = %e, "send task did not complete");
        ServerError::Internal(e.to_string())
    }
}
