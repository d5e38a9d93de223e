pub mod composer;
pub mod conversation;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Routes nested under `/v1`.
pub fn router(max_upload_bytes: u64) -> Router<Arc<AppState>> {
    Router::new()
        .merge(conversation::router())
        .merge(composer::router(max_upload_bytes))
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut doc = V1Api::openapi();
    doc.merge(conversation::ConversationApi::openapi());
    doc.merge(composer::ComposerApi::openapi());

    doc
}
