//! Read side of the conversation.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::schemas::v1::conversation::ConversationResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_conversation), components(schemas(ConversationResponse)))]
pub struct ConversationApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/conversation", get(get_conversation))
}

/// Current messages, composer contents and send phase
/// (`GET /v1/conversation`).
#[utoipa::path(
    get,
    path = "/v1/conversation",
    tag = "conversation",
    responses(
        (status = 200, description = "Conversation snapshot", body = ConversationResponse),
    )
)]
pub async fn get_conversation(State(state): State<Arc<AppState>>) -> Json<ConversationResponse> {
    Json(state.orchestrator.snapshot().into())
}
