#![allow(dead_code)]
use utoipa::OpenApi;

use crate::handlers::{CreateNotificationRequest, UpdateNotificationRequest};
use priority_notify_common::{FieldError, Notification, Page, Priority, Status};

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        ("since" = Option<String>, Query, description = "Only notifications created after this RFC 3339 timestamp"),
        ("status" = Option<Status>, Query, description = "Filter by status"),
        ("priority" = Option<Priority>, Query, description = "Filter by priority"),
        ("source" = Option<String>, Query, description = "Filter by source tag"),
        ("limit" = Option<u32>, Query, description = "Page size, 1 to 200, default 50"),
        ("offset" = Option<u32>, Query, description = "Items to skip, default 0")
    ),
    responses(
        (status = 200, description = "A page of notifications, newest first", body = Page<Notification>),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Invalid query")
    ),
    tag = "Notifications"
)]
fn doc_list_notifications_handler() {}

#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body(content = CreateNotificationRequest, example = json!({
        "title": "Backup failed",
        "message": "nightly job exited with status 2",
        "priority": "high",
        "source": "ci",
        "metadata": {"job": "nightly-backup"}
    })),
    responses(
        (status = 201, description = "Notification stored and published", body = Notification),
        (status = 401, description = "Not authenticated"),
        (status = 422, description = "Validation failed",
         example = json!({"error": {"message": "Validation failed", "code": 422,
                                    "fields": [{"field": "title", "message": "is required"}]}}))
    ),
    tag = "Notifications"
)]
fn doc_create_notification_handler() {}

#[utoipa::path(
    get,
    path = "/api/notifications/stream",
    responses(
        (status = 200, description = "Server-sent events: `notification` carries the notification, \
`status_change` carries `{id, status}`, `ping` is sent after 30 quiet seconds",
         content_type = "text/event-stream"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Notifications"
)]
fn doc_stream_notifications_handler() {}

#[utoipa::path(
    get,
    path = "/api/notifications/{id}",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "The notification", body = Notification),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Notification not found")
    ),
    tag = "Notifications"
)]
fn doc_get_notification_handler() {}

#[utoipa::path(
    patch,
    path = "/api/notifications/{id}",
    params(("id" = String, Path, description = "Notification id")),
    request_body(content = UpdateNotificationRequest, example = json!({"status": "read"})),
    responses(
        (status = 200, description = "The updated notification", body = Notification),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Notification not found"),
        (status = 422, description = "Unknown status")
    ),
    tag = "Notifications"
)]
fn doc_update_notification_handler() {}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Notification not found")
    ),
    tag = "Notifications"
)]
fn doc_delete_notification_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_list_notifications_handler,
        doc_create_notification_handler,
        doc_stream_notifications_handler,
        doc_get_notification_handler,
        doc_update_notification_handler,
        doc_delete_notification_handler,
    ),
    components(
        schemas(
            CreateNotificationRequest,
            UpdateNotificationRequest,
            Notification,
            Page<Notification>,
            Priority,
            Status,
            FieldError,
        )
    ),
    tags(
        (name = "Notifications", description = "Notification inbox and live stream")
    )
)]
pub struct NotificationsApiDoc;
