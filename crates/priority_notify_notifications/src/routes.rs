use axum::{routing::get, Router};
use tracing::info;

use crate::handlers::{
    create_notification_handler, delete_notification_handler, get_notification_handler,
    list_notifications_handler, stream_notifications_handler, update_notification_handler,
    NotificationsState,
};

/// Create the notification inbox routes
///
/// The `/stream` route is registered before `/{id}` so it never reaches the
/// single-notification handlers.
///
/// # Arguments
///
/// * `state` - The resolver, the notification repository and the event broker
///
/// # Returns
///
/// An Axum router with the notification endpoints
pub fn routes(state: NotificationsState) -> Router {
    info!(
        heartbeat_secs = state.heartbeat.as_secs(),
        "Notification routes initialized"
    );

    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications_handler).post(create_notification_handler),
        )
        .route("/api/notifications/stream", get(stream_notifications_handler))
        .route(
            "/api/notifications/{id}",
            get(get_notification_handler)
                .patch(update_notification_handler)
                .delete(delete_notification_handler),
        )
        .with_state(state)
}
