use priority_notify_auth::openapi::AuthApiDoc;
use priority_notify_notifications::openapi::NotificationsApiDoc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "priority-notify API",
        version = "0.1.0",
        description = "Personal notification inbox with a live event stream"
    ),
    tags((name = "Health", description = "Service liveness"))
)]
struct ApiDoc;

/// The merged document of every feature crate.
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(AuthApiDoc::openapi());
    doc.merge(NotificationsApiDoc::openapi());
    doc
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi())
}
