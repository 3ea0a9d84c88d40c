//! Repository for notifications
//!
//! All lookups are scoped by owner: a notification that belongs to someone
//! else behaves exactly like one that does not exist.

use crate::error::DbError;
use chrono::{DateTime, Utc};
use priority_notify_common::{Notification, Priority, Status};

/// A notification about to be stored.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: Option<String>,
    pub priority: Priority,
    pub source: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Optional filters for listing. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationFilter {
    /// Only notifications created strictly after this instant.
    pub since: Option<DateTime<Utc>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub source: Option<String>,
}

/// Repository for notifications
pub trait NotificationRepository {
    /// Create the `notifications` table and its index if they do not exist.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Store a new notification with status `unread` and no `read_at`.
    fn insert(
        &self,
        notification: NewNotification,
    ) -> impl std::future::Future<Output = Result<Notification, DbError>> + Send;

    /// Find one notification owned by `user_id`.
    fn find_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Notification>, DbError>> + Send;

    /// A page of a user's notifications, newest first.
    ///
    /// # Returns
    ///
    /// The page items and the total number of matches ignoring limit and offset
    fn list_for_user(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
        limit: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<(Vec<Notification>, i64), DbError>> + Send;

    /// Change the status of a notification owned by `user_id`.
    ///
    /// `read_at` is set to `now` only when the new status is `read` and it was
    /// never set before. Any status may follow any other.
    ///
    /// # Returns
    ///
    /// The updated notification, or `None` if no owned notification matched
    fn update_status(
        &self,
        id: &str,
        user_id: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<Notification>, DbError>> + Send;

    /// Delete a notification owned by `user_id`.
    ///
    /// # Returns
    ///
    /// `true` if a notification was deleted, `false` if none matched
    fn delete_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, DbError>> + Send;
}
