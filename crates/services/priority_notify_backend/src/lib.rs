//! The priority-notify HTTP service
//!
//! [`build_router`] assembles the feature routers, the allowed-host guard,
//! CORS and request tracing around an [`AppState`]. The binary in `main.rs`
//! loads the configuration, prepares the database and serves the router.

pub mod app_state;
#[cfg(feature = "openapi")]
pub mod docs;
pub mod host_guard;

use axum::{http::HeaderValue, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use app_state::{AppState, AppStateBuilder, StartupError};
pub use host_guard::{allowed_host_guard, AllowedHosts};

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// CORS for the configured origins, or `None` when there are none.
pub fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}

/// Build the complete application router.
pub fn build_router(state: &AppState) -> Router {
    let config = &state.config;

    let mut app = Router::new()
        .route("/health", get(health_handler))
        .merge(priority_notify_auth::routes(state.auth_state()))
        .merge(priority_notify_notifications::routes(
            state.notifications_state(),
        ));

    #[cfg(feature = "openapi")]
    {
        info!("Adding Swagger UI at /api/docs");
        app = app.merge(docs::swagger_ui());
    }

    if let Some(dir) = &config.static_dir {
        info!("Serving static files from {}", dir);
        app = app
            .nest_service("/static", ServeDir::new(dir))
            .fallback_service(ServeDir::new(dir));
    }

    let allowed_hosts = Arc::new(AllowedHosts::new(&config.server.allowed_hosts));
    app = app.layer(middleware::from_fn_with_state(
        allowed_hosts,
        allowed_host_guard,
    ));
    if let Some(cors) = cors_layer(&config.cors_origins) {
        app = app.layer(cors);
    }
    app.layer(TraceLayer::new_for_http())
}
