use crate::routes::v1;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "parley-server",
        description = "Single-conversation chat service with image and file attachments",
    ),
    tags(
        (name = "conversation", description = "Conversation log and send phase"),
        (name = "composer", description = "Input text, attachment selection and send"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(v1::api_docs());
    root.merge(super::health::HealthApi::openapi());
    root
}
