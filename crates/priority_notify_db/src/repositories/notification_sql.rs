//! SQL implementation of the notification repository

use crate::error::DbError;
use crate::repositories::notification::{NewNotification, NotificationFilter, NotificationRepository};
use crate::repositories::{decode_enum, decode_opt_ts, decode_ts, encode_ts, get_opt_text};
use crate::DbClient;
use chrono::{DateTime, Utc};
use priority_notify_common::{Notification, Status};
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, priority, status, source, created_at, read_at, metadata";

/// SQL implementation of the notification repository
#[derive(Debug, Clone)]
pub struct SqlNotificationRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlNotificationRepository {
    /// Create a new SQL notification repository
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn notification_from_row(row: &AnyRow) -> Result<Notification, DbError> {
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let metadata = get_opt_text(row, "metadata")?;
    let metadata = metadata
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| DbError::DecodeError {
            column: "metadata",
            message: e.to_string(),
        })?;

    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        message: get_opt_text(row, "message")?,
        priority: decode_enum("priority", &priority)?,
        status: decode_enum("status", &status)?,
        source: get_opt_text(row, "source")?,
        created_at: decode_ts("created_at", &created_at)?,
        read_at: decode_opt_ts("read_at", get_opt_text(row, "read_at")?)?,
        metadata,
    })
}

/// WHERE clause and its bound values, numbered from `$1`.
fn filter_clause(user_id: &str, filter: &NotificationFilter) -> (String, Vec<String>) {
    let mut clauses = vec!["user_id = $1".to_string()];
    let mut binds = vec![user_id.to_string()];

    if let Some(since) = filter.since {
        binds.push(encode_ts(since));
        clauses.push(format!("created_at > ${}", binds.len()));
    }
    if let Some(status) = filter.status {
        binds.push(status.as_str().to_string());
        clauses.push(format!("status = ${}", binds.len()));
    }
    if let Some(priority) = filter.priority {
        binds.push(priority.as_str().to_string());
        clauses.push(format!("priority = ${}", binds.len()));
    }
    if let Some(source) = &filter.source {
        binds.push(source.clone());
        clauses.push(format!("source = ${}", binds.len()));
    }

    (clauses.join(" AND "), binds)
}

impl NotificationRepository for SqlNotificationRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing notification schema");

        let table = r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                message TEXT,
                priority TEXT NOT NULL,
                status TEXT NOT NULL,
                source TEXT,
                created_at TEXT NOT NULL,
                read_at TEXT,
                metadata TEXT
            )
        "#;
        self.db_client.execute(table).await?;
        self.db_client
            .execute(
                "CREATE INDEX IF NOT EXISTS ix_notifications_user_created ON notifications (user_id, created_at)",
            )
            .await?;

        info!("Notification schema initialized successfully");
        Ok(())
    }

    async fn insert(&self, notification: NewNotification) -> Result<Notification, DbError> {
        let stored = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: notification.user_id,
            title: notification.title,
            message: notification.message,
            priority: notification.priority,
            status: Status::Unread,
            source: notification.source,
            created_at: Utc::now(),
            read_at: None,
            metadata: notification.metadata,
        };

        let query = r#"
            INSERT INTO notifications (id, user_id, title, message, priority, status, source, created_at, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#;
        sqlx::query(query)
            .bind(stored.id.clone())
            .bind(stored.user_id.clone())
            .bind(stored.title.clone())
            .bind(stored.message.clone())
            .bind(stored.priority.as_str())
            .bind(stored.status.as_str())
            .bind(stored.source.clone())
            .bind(encode_ts(stored.created_at))
            .bind(stored.metadata.as_ref().map(|m| m.to_string()))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert notification: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        debug!("Stored notification {} for user {}", stored.id, stored.user_id);
        Ok(stored)
    }

    async fn find_for_user(&self, id: &str, user_id: &str) -> Result<Option<Notification>, DbError> {
        let query = format!(
            "SELECT {} FROM notifications WHERE id = $1 AND user_id = $2",
            NOTIFICATION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find notification: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        row.as_ref().map(notification_from_row).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        filter: &NotificationFilter,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Notification>, i64), DbError> {
        let (where_sql, binds) = filter_clause(user_id, filter);

        let count_sql = format!("SELECT COUNT(*) AS total FROM notifications WHERE {}", where_sql);
        let mut count_query = sqlx::query(&count_sql);
        for value in &binds {
            count_query = count_query.bind(value.clone());
        }
        let total: i64 = count_query
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to count notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?
            .try_get("total")?;

        let page_sql = format!(
            "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            NOTIFICATION_COLUMNS,
            where_sql,
            binds.len() + 1,
            binds.len() + 2
        );
        let mut page_query = sqlx::query(&page_sql);
        for value in &binds {
            page_query = page_query.bind(value.clone());
        }
        let rows = page_query
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list notifications: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        let items = rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total))
    }

    async fn update_status(
        &self,
        id: &str,
        user_id: &str,
        status: Status,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, DbError> {
        // COALESCE keeps an existing read_at; a NULL candidate leaves it untouched
        let read_at_candidate = (status == Status::Read).then(|| encode_ts(now));

        let result = sqlx::query(
            "UPDATE notifications SET status = $1, read_at = COALESCE(read_at, $2) WHERE id = $3 AND user_id = $4",
        )
        .bind(status.as_str())
        .bind(read_at_candidate)
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to update notification status: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_for_user(id, user_id).await
    }

    async fn delete_for_user(&self, id: &str, user_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete notification: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{SqlUserRepository, UserRepository};
    use chrono::Duration;
    use priority_notify_common::Priority;
    use serde_json::json;

    async fn setup() -> (SqlNotificationRepository, String) {
        let client = DbClient::from_url("sqlite::memory:").await.expect("pool");
        let users = SqlUserRepository::new(client.clone());
        users.init_schema().await.expect("users schema");
        let repo = SqlNotificationRepository::new(client);
        repo.init_schema().await.expect("notifications schema");
        let user = users
            .upsert_by_sub("sub-1", "a@example.com", "A")
            .await
            .expect("user");
        (repo, user.id)
    }

    fn new_notification(user_id: &str, title: &str, priority: Priority) -> NewNotification {
        NewNotification {
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: None,
            priority,
            source: Some("ci".to_string()),
            metadata: None,
        }
    }

    #[test]
    fn test_filter_clause_numbers_parameters() {
        let filter = NotificationFilter {
            status: Some(Status::Read),
            source: Some("backup".to_string()),
            ..Default::default()
        };
        let (sql, binds) = filter_clause("u1", &filter);
        assert_eq!(sql, "user_id = $1 AND status = $2 AND source = $3");
        assert_eq!(binds, vec!["u1", "read", "backup"]);
    }

    #[tokio::test]
    async fn test_insert_round_trips_metadata() {
        let (repo, user_id) = setup().await;
        let mut new = new_notification(&user_id, "Disk full", Priority::High);
        new.message = Some("/var is at 98%".to_string());
        new.metadata = Some(json!({"host": "db1", "usage": 98}));

        let stored = repo.insert(new).await.unwrap();
        assert_eq!(stored.status, Status::Unread);
        assert!(stored.read_at.is_none());

        let found = repo.find_for_user(&stored.id, &user_id).await.unwrap().unwrap();
        assert_eq!(found.metadata, Some(json!({"host": "db1", "usage": 98})));
        assert_eq!(found.message.as_deref(), Some("/var is at 98%"));
        assert!(repo.find_for_user(&stored.id, "intruder").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pages_and_filters() {
        let (repo, user_id) = setup().await;
        for i in 0..4 {
            repo.insert(new_notification(&user_id, &format!("low {}", i), Priority::Low))
                .await
                .unwrap();
        }
        let critical = repo
            .insert(new_notification(&user_id, "critical", Priority::Critical))
            .await
            .unwrap();

        let (page, total) = repo
            .list_for_user(&user_id, &NotificationFilter::default(), 2, 0)
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, critical.id);

        let filter = NotificationFilter {
            priority: Some(Priority::Critical),
            ..Default::default()
        };
        let (only, total) = repo.list_for_user(&user_id, &filter, 50, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(only[0].id, critical.id);

        let filter = NotificationFilter {
            since: Some(critical.created_at + Duration::seconds(1)),
            ..Default::default()
        };
        let (none, total) = repo.list_for_user(&user_id, &filter, 50, 0).await.unwrap();
        assert!(none.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_read_at_is_set_once() {
        let (repo, user_id) = setup().await;
        let stored = repo
            .insert(new_notification(&user_id, "Test alert", Priority::High))
            .await
            .unwrap();

        let first_read = Utc::now();
        let read = repo
            .update_status(&stored.id, &user_id, Status::Read, first_read)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read.status, Status::Read);
        let read_at = read.read_at.expect("read_at set");

        let again = repo
            .update_status(&stored.id, &user_id, Status::Read, first_read + Duration::hours(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.read_at, Some(read_at));

        // backward moves are allowed and keep read_at
        let unread = repo
            .update_status(&stored.id, &user_id, Status::Unread, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unread.status, Status::Unread);
        assert_eq!(unread.read_at, Some(read_at));
    }

    #[tokio::test]
    async fn test_update_and_delete_hide_foreign_rows() {
        let (repo, user_id) = setup().await;
        let stored = repo
            .insert(new_notification(&user_id, "mine", Priority::Medium))
            .await
            .unwrap();

        assert!(repo
            .update_status(&stored.id, "intruder", Status::Archived, Utc::now())
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete_for_user(&stored.id, "intruder").await.unwrap());
        assert!(repo.delete_for_user(&stored.id, &user_id).await.unwrap());
        assert!(repo.find_for_user(&stored.id, &user_id).await.unwrap().is_none());
    }
}
