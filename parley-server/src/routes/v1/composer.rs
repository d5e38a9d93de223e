//! Composer intents: edit the input text, select or clear the attachment,
//! and send.
//!
//! A send always runs to completion in its own tokio task, so a client that
//! disconnects mid-request cannot leave the conversation with a user message
//! and no reply.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use parley_core::{AttachmentError, PendingAttachment, SendOutcome};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::v1::conversation::{
    AttachmentResponse, AttachmentUpload, ComposerResponse, MessageResponse, SendResponse,
    SetTextRequest,
};
use crate::state::AppState;

/// Room for multipart framing on top of the attachment itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(set_text, select_attachment, clear_attachment, send),
    components(schemas(
        SetTextRequest,
        ComposerResponse,
        AttachmentResponse,
        AttachmentUpload,
        SendResponse,
        MessageResponse
    ))
)]
pub struct ComposerApi;

/// Register composer routes.
pub fn router(max_upload_bytes: u64) -> Router<Arc<AppState>> {
    let body_limit = usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/composer/text", put(set_text))
        .route(
            "/composer/attachment",
            post(select_attachment)
                .delete(clear_attachment)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/composer/send", post(send))
}

/// Replace the input text (`PUT /v1/composer/text`).
#[utoipa::path(
    put,
    path = "/v1/composer/text",
    tag = "composer",
    request_body = SetTextRequest,
    responses(
        (status = 200, description = "Input text updated", body = ComposerResponse),
    )
)]
pub async fn set_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetTextRequest>,
) -> Json<ComposerResponse> {
    state.orchestrator.set_input_text(req.text);
    Json(state.orchestrator.composer().into())
}

/// Select the pending attachment (`POST /v1/composer/attachment`).
///
/// Accepts one file in the multipart field `file`. A previously selected
/// attachment is replaced.
#[utoipa::path(
    post,
    path = "/v1/composer/attachment",
    tag = "composer",
    request_body(content = AttachmentUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Attachment selected", body = ComposerResponse),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 413, description = "File too large"),
    )
)]
pub async fn select_attachment(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ComposerResponse>, ServerError> {
    let max_bytes = state.attachment_policy.max_bytes;
    let mut upload = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("unknown").to_owned();
        if field_name != "file" {
            return Err(ServerError::BadRequest(format!("Unknown field: {field_name}")));
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_owned();
        let content_type = field.content_type().map(str::to_owned);

        let mut file_bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            file_bytes.extend_from_slice(&chunk);
            if file_bytes.len() as u64 > max_bytes {
                return Err(AttachmentError::TooLarge {
                    size: file_bytes.len() as u64,
                    max: max_bytes,
                }
                .into());
            }
        }

        debug!(
            file_name = %file_name,
            content_type = ?content_type,
            size_bytes = file_bytes.len(),
            "received attachment upload"
        );
        upload = Some((file_name, content_type, file_bytes));
    }

    let Some((file_name, content_type, file_bytes)) = upload else {
        return Err(ServerError::BadRequest("No file uploaded".into()));
    };

    let attachment = PendingAttachment::spool(
        file_name,
        content_type.as_deref(),
        file_bytes.into(),
        &state.attachment_policy,
    )
    .await?;
    info!(
        name = %attachment.name(),
        mime_type = %attachment.mime_type(),
        size_bytes = attachment.size_bytes(),
        "attachment selected"
    );
    state.orchestrator.select_attachment(attachment);

    Ok(Json(state.orchestrator.composer().into()))
}

/// Remove the pending attachment (`DELETE /v1/composer/attachment`).
#[utoipa::path(
    delete,
    path = "/v1/composer/attachment",
    tag = "composer",
    responses(
        (status = 200, description = "Attachment cleared (no-op when none was pending)", body = ComposerResponse),
    )
)]
pub async fn clear_attachment(State(state): State<Arc<AppState>>) -> Json<ComposerResponse> {
    if state.orchestrator.clear_attachment() {
        debug!("pending attachment cleared");
    }
    Json(state.orchestrator.composer().into())
}

/// Send the composed message (`POST /v1/composer/send`).
///
/// Provider failures are not HTTP errors: they come back as a `200` whose
/// reply is an error-marked assistant message with `resolution: "failed"`.
#[utoipa::path(
    post,
    path = "/v1/composer/send",
    tag = "composer",
    responses(
        (status = 200, description = "Send cycle completed", body = SendResponse),
        (status = 400, description = "Nothing to send"),
        (status = 409, description = "Another send is in flight"),
    )
)]
pub async fn send(State(state): State<Arc<AppState>>) -> Result<Json<SendResponse>, ServerError> {
    let orchestrator = Arc::clone(&state.orchestrator);
    let outcome = tokio::spawn(async move { orchestrator.send().await }).await?;

    match outcome {
        SendOutcome::Completed(exchange) => Ok(Json(exchange.into())),
        SendOutcome::Rejected(e) => Err(ServerError::BadRequest(e.to_string())),
        SendOutcome::Busy => Err(ServerError::Conflict(
            "a message is already being sent".into(),
        )),
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(e.body_text())
    } else {
        ServerError::BadRequest(format!("Failed to read multipart field: {}", e.body_text()))
    }
}
