//! SQL implementation of the user repository

use crate::error::DbError;
use crate::repositories::user::UserRepository;
use crate::repositories::{decode_ts, encode_ts};
use crate::DbClient;
use chrono::Utc;
use priority_notify_common::User;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, sub, email, name, created_at, last_login_at";

/// SQL implementation of the user repository
#[derive(Debug, Clone)]
pub struct SqlUserRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlUserRepository {
    /// Create a new SQL user repository
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row = sqlx::query(&query)
            .bind(value.to_string())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find user by {}: {}", column, e);
                DbError::QueryError(e.to_string())
            })?;

        row.as_ref().map(user_from_row).transpose()
    }
}

fn user_from_row(row: &AnyRow) -> Result<User, DbError> {
    let created_at: String = row.try_get("created_at")?;
    let last_login_at: String = row.try_get("last_login_at")?;
    Ok(User {
        id: row.try_get("id")?,
        sub: row.try_get("sub")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: decode_ts("created_at", &created_at)?,
        last_login_at: decode_ts("last_login_at", &last_login_at)?,
    })
}

impl UserRepository for SqlUserRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing user schema");

        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                sub TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_login_at TEXT NOT NULL
            )
        "#;
        self.db_client.execute(query).await?;

        info!("User schema initialized successfully");
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DbError> {
        self.fetch_one_where("id", id).await
    }

    async fn find_by_sub(&self, sub: &str) -> Result<Option<User>, DbError> {
        self.fetch_one_where("sub", sub).await
    }

    async fn upsert_by_sub(&self, sub: &str, email: &str, name: &str) -> Result<User, DbError> {
        debug!("Upserting user for subject: {}", sub);

        let query = r#"
            INSERT INTO users (id, sub, email, name, created_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT(sub) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                last_login_at = excluded.last_login_at
        "#;

        sqlx::query(query)
            .bind(Uuid::new_v4().to_string())
            .bind(sub.to_string())
            .bind(email.to_string())
            .bind(name.to_string())
            .bind(encode_ts(Utc::now()))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to upsert user: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        self.find_by_sub(sub)
            .await?
            .ok_or_else(|| DbError::QueryError(format!("user {} vanished after upsert", sub)))
    }
}
