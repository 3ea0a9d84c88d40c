//! Repository modules for database access
//!
//! Each entity has a trait describing what the services need and an SQL
//! implementation on top of [`DbClient`](crate::DbClient).

pub mod client_token;
pub mod client_token_sql;
pub mod notification;
pub mod notification_sql;
pub mod user;
pub mod user_sql;

pub use client_token::{ClientTokenRepository, NewClientToken};
pub use client_token_sql::SqlClientTokenRepository;
pub use notification::{NewNotification, NotificationFilter, NotificationRepository};
pub use notification_sql::SqlNotificationRepository;
pub use user::UserRepository;
pub use user_sql::SqlUserRepository;

use crate::error::DbError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::any::AnyRow;
use sqlx::{Row, ValueRef};
use std::str::FromStr;

/// Read a nullable text column.
///
/// The `Any` driver reports SQL `NULL` as its own type, so a typed
/// `Option<String>` decode of a NULL cell fails; check for NULL first.
pub(crate) fn get_opt_text(row: &AnyRow, column: &str) -> Result<Option<String>, DbError> {
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    Ok(Some(row.try_get(column)?))
}

/// Timestamps are stored as fixed-width RFC 3339 text so that string order is time order.
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(column: &'static str, raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DbError::DecodeError {
            column,
            message: e.to_string(),
        })
}

pub(crate) fn decode_opt_ts(
    column: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.map(|value| decode_ts(column, &value)).transpose()
}

pub(crate) fn decode_enum<T>(column: &'static str, raw: &str) -> Result<T, DbError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| DbError::DecodeError {
        column,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use priority_notify_common::Priority;

    #[test]
    fn test_encoded_timestamps_sort_like_time() {
        let earlier = Utc.with_ymd_and_hms(2025, 1, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        assert!(encode_ts(earlier) < encode_ts(later));
        assert_eq!(encode_ts(later), "2025-01-10T00:00:00.000000Z");
        assert_eq!(decode_ts("created_at", &encode_ts(later)).unwrap(), later);
    }

    #[tokio::test]
    async fn test_nullable_text_columns_decode_to_none() {
        let db = crate::DbClient::from_url("sqlite::memory:").await.unwrap();
        let row = sqlx::query("SELECT NULL AS read_at, 'ci' AS source")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(get_opt_text(&row, "read_at").unwrap(), None);
        assert_eq!(get_opt_text(&row, "source").unwrap().as_deref(), Some("ci"));
        assert!(get_opt_text(&row, "missing").is_err());
    }

    #[test]
    fn test_decode_errors_name_the_column() {
        let err = decode_ts("read_at", "yesterday").unwrap_err();
        assert!(err.to_string().contains("read_at"));
        let err = decode_enum::<Priority>("priority", "urgent").unwrap_err();
        assert!(err.to_string().contains("urgent"));
    }
}
