//! HTTP handlers for the notification inbox
//!
//! Every handler accepts a session cookie or a bearer token. Writes are
//! stored first and then published to the caller's open streams; a failed or
//! skipped publish never undoes the write.

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use priority_notify_auth::{CurrentUser, IdentityResolver};
use priority_notify_common::{
    not_found, FieldError, JsonBody, Notification, NotifyError, Page, Priority, QueryParams,
    Status,
};
use priority_notify_db::{
    NewNotification, NotificationFilter, NotificationRepository, SqlNotificationRepository,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::broker::{EventBroker, EventType};
use crate::stream::event_stream;

pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_SOURCE_LEN: usize = 255;
pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 200;

/// Shared state for the notification handlers
#[derive(Clone)]
pub struct NotificationsState {
    pub resolver: Arc<IdentityResolver>,
    pub notifications: SqlNotificationRepository,
    pub broker: Arc<EventBroker>,
    /// Quiet time on a stream before a ping is sent
    pub heartbeat: Duration,
}

impl FromRef<NotificationsState> for Arc<IdentityResolver> {
    fn from_ref(state: &NotificationsState) -> Self {
        state.resolver.clone()
    }
}

/// Query string for listing notifications
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Only notifications created after this RFC 3339 timestamp
    pub since: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A list query that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidListQuery {
    pub filter: NotificationFilter,
    pub limit: u32,
    pub offset: u32,
}

/// Request body for creating a notification
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateNotificationRequest {
    /// Required, at most 500 characters
    pub title: Option<String>,
    pub message: Option<String>,
    /// `low`, `medium`, `high` or `critical`. Defaults to `medium`.
    pub priority: Option<String>,
    /// Free-form origin tag, at most 255 characters
    pub source: Option<String>,
    /// Any JSON object
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub metadata: Option<Value>,
}

/// Request body for updating a notification
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateNotificationRequest {
    /// `unread`, `read` or `archived`. Omit to leave the status unchanged.
    pub status: Option<String>,
}

fn parse_named<T>(field: &str, raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw?.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(FieldError::new(field, e.to_string()));
            None
        }
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize, errors: &mut Vec<FieldError>) {
    if value.is_some_and(|v| v.chars().count() > max) {
        errors.push(FieldError::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, NotifyError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(NotifyError::Validation(errors))
    }
}

impl ListQuery {
    pub fn validate(self) -> Result<ValidListQuery, NotifyError> {
        let mut errors = Vec::new();

        let since = match self.since.as_deref() {
            None => None,
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(_) => {
                    errors.push(FieldError::new("since", "must be an RFC 3339 timestamp"));
                    None
                }
            },
        };
        let status = parse_named::<Status>("status", self.status.as_deref(), &mut errors);
        let priority = parse_named::<Priority>("priority", self.priority.as_deref(), &mut errors);

        let limit = self.limit.unwrap_or(i64::from(DEFAULT_LIMIT));
        if !(1..=i64::from(MAX_LIMIT)).contains(&limit) {
            errors.push(FieldError::new(
                "limit",
                format!("must be between 1 and {}", MAX_LIMIT),
            ));
        }
        let offset = self.offset.unwrap_or(0);
        let offset_ok = u32::try_from(offset).ok();
        if offset < 0 {
            errors.push(FieldError::new("offset", "must be zero or more"));
        } else if offset_ok.is_none() {
            errors.push(FieldError::new(
                "offset",
                format!("must be at most {}", u32::MAX),
            ));
        }

        let query = ValidListQuery {
            filter: NotificationFilter {
                since,
                status,
                priority,
                source: self.source.filter(|s| !s.is_empty()),
            },
            limit: u32::try_from(limit).unwrap_or(DEFAULT_LIMIT),
            offset: offset_ok.unwrap_or(0),
        };
        finish(query, errors)
    }
}

impl CreateNotificationRequest {
    pub fn validate(self, user_id: &str) -> Result<NewNotification, NotifyError> {
        let mut errors = Vec::new();

        match self.title.as_deref() {
            None => errors.push(FieldError::new("title", "is required")),
            Some(title) if title.trim().is_empty() => {
                errors.push(FieldError::new("title", "must not be empty"))
            }
            title => check_len("title", title, MAX_TITLE_LEN, &mut errors),
        }
        let priority = parse_named::<Priority>("priority", self.priority.as_deref(), &mut errors)
            .unwrap_or_default();
        check_len("source", self.source.as_deref(), MAX_SOURCE_LEN, &mut errors);

        let metadata = match self.metadata {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(Value::Object(map)),
            Some(_) => {
                errors.push(FieldError::new("metadata", "must be a JSON object"));
                None
            }
        };

        let notification = NewNotification {
            user_id: user_id.to_string(),
            title: self.title.unwrap_or_default(),
            message: self.message,
            priority,
            source: self.source,
            metadata,
        };
        finish(notification, errors)
    }
}

impl UpdateNotificationRequest {
    pub fn validate(self) -> Result<Option<Status>, NotifyError> {
        let mut errors = Vec::new();
        let status = parse_named::<Status>("status", self.status.as_deref(), &mut errors);
        finish(status, errors)
    }
}

/// A page of the caller's notifications, newest first.
pub async fn list_notifications_handler(
    State(state): State<NotificationsState>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Page<Notification>>, NotifyError> {
    let query = query.validate()?;
    let (items, total) = state
        .notifications
        .list_for_user(&user.id, &query.filter, query.limit, query.offset)
        .await?;
    Ok(Json(Page {
        items,
        total,
        limit: query.limit,
        offset: query.offset,
    }))
}

/// Store a notification and push it to the caller's open streams.
pub async fn create_notification_handler(
    State(state): State<NotificationsState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), NotifyError> {
    let new = request.validate(&user.id)?;
    let notification = state.notifications.insert(new).await?;
    info!(
        id = %notification.id,
        user_id = %user.id,
        priority = %notification.priority,
        "Notification created"
    );

    state
        .broker
        .publish(&user.id, EventType::Notification, serde_json::to_value(&notification)?);
    Ok((StatusCode::CREATED, Json(notification)))
}

/// Live events for the caller as server-sent events.
pub async fn stream_notifications_handler(
    State(state): State<NotificationsState>,
    CurrentUser(user): CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.broker.subscribe(&user.id);
    let events = event_stream(subscription, state.heartbeat).map(|event| {
        Ok::<_, Infallible>(
            Event::default()
                .event(event.event_type.as_str())
                .data(event.data()),
        )
    });
    Sse::new(events)
}

pub async fn get_notification_handler(
    State(state): State<NotificationsState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Notification>, NotifyError> {
    state
        .notifications
        .find_for_user(&id, &user.id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Notification"))
}

/// Change the status and tell the caller's open streams.
pub async fn update_notification_handler(
    State(state): State<NotificationsState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateNotificationRequest>,
) -> Result<Json<Notification>, NotifyError> {
    let status = request.validate()?;

    let updated = match status {
        Some(status) => {
            state
                .notifications
                .update_status(&id, &user.id, status, Utc::now())
                .await?
        }
        None => state.notifications.find_for_user(&id, &user.id).await?,
    };
    let notification = updated.ok_or_else(|| not_found("Notification"))?;

    state.broker.publish(
        &user.id,
        EventType::StatusChange,
        json!({ "id": notification.id, "status": notification.status }),
    );
    Ok(Json(notification))
}

pub async fn delete_notification_handler(
    State(state): State<NotificationsState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, NotifyError> {
    if state.notifications.delete_for_user(&id, &user.id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Notification"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: NotifyError) -> Vec<String> {
        match err {
            NotifyError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default().validate().unwrap();
        assert_eq!(query.limit, 50);
        assert_eq!(query.offset, 0);
        assert_eq!(query.filter, NotificationFilter::default());
    }

    #[test]
    fn test_list_query_bounds() {
        for limit in [0, 201, -1] {
            let query = ListQuery {
                limit: Some(limit),
                ..Default::default()
            };
            assert_eq!(fields(query.validate().unwrap_err()), ["limit"]);
        }
        let query = ListQuery {
            limit: Some(200),
            offset: Some(-1),
            ..Default::default()
        };
        assert_eq!(fields(query.validate().unwrap_err()), ["offset"]);
    }

    #[test]
    fn test_offset_errors_describe_the_bound() {
        let message = |offset: i64| match (ListQuery {
            offset: Some(offset),
            ..Default::default()
        })
        .validate()
        {
            Err(NotifyError::Validation(fields)) => fields[0].message.clone(),
            other => panic!("expected validation error, got {:?}", other.map(|q| q.offset)),
        };
        assert_eq!(message(-5), "must be zero or more");
        assert_eq!(message(i64::from(u32::MAX) + 1), format!("must be at most {}", u32::MAX));
        let query = ListQuery {
            offset: Some(i64::from(u32::MAX)),
            ..Default::default()
        };
        assert_eq!(query.validate().unwrap().offset, u32::MAX);
    }

    #[test]
    fn test_list_query_filters() {
        let query = ListQuery {
            since: Some("2024-05-01T12:00:00+02:00".to_string()),
            status: Some("read".to_string()),
            priority: Some("critical".to_string()),
            source: Some("ci".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(query.filter.status, Some(Status::Read));
        assert_eq!(query.filter.priority, Some(Priority::Critical));
        assert_eq!(query.filter.source.as_deref(), Some("ci"));
        assert_eq!(
            query.filter.since.map(|s| s.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );

        let bad = ListQuery {
            since: Some("yesterday".to_string()),
            priority: Some("urgent".to_string()),
            ..Default::default()
        };
        assert_eq!(fields(bad.validate().unwrap_err()), ["since", "priority"]);
    }

    #[test]
    fn test_create_request_validation() {
        let ok = CreateNotificationRequest {
            title: Some("Test alert".to_string()),
            priority: Some("high".to_string()),
            source: Some("ci".to_string()),
            ..Default::default()
        }
        .validate("u1")
        .unwrap();
        assert_eq!(ok.priority, Priority::High);
        assert_eq!(ok.user_id, "u1");

        let defaulted = CreateNotificationRequest {
            title: Some("x".repeat(500)),
            ..Default::default()
        }
        .validate("u1")
        .unwrap();
        assert_eq!(defaulted.priority, Priority::Medium);

        let err = CreateNotificationRequest {
            title: Some("x".repeat(501)),
            source: Some("s".repeat(256)),
            metadata: Some(json!([1, 2])),
            ..Default::default()
        }
        .validate("u1")
        .unwrap_err();
        assert_eq!(fields(err), ["title", "source", "metadata"]);

        let err = CreateNotificationRequest::default().validate("u1").unwrap_err();
        assert_eq!(fields(err), ["title"]);
    }

    #[test]
    fn test_update_request_validation() {
        let status = UpdateNotificationRequest {
            status: Some("archived".to_string()),
        };
        assert_eq!(status.validate().unwrap(), Some(Status::Archived));
        assert_eq!(UpdateNotificationRequest::default().validate().unwrap(), None);
        let bad = UpdateNotificationRequest {
            status: Some("deleted".to_string()),
        };
        assert_eq!(fields(bad.validate().unwrap_err()), ["status"]);
    }
}
