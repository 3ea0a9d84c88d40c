//! SQL implementation of the client token repository

use crate::error::DbError;
use crate::repositories::client_token::{ClientTokenRepository, NewClientToken};
use crate::repositories::{decode_enum, decode_opt_ts, decode_ts, encode_ts, get_opt_text};
use crate::DbClient;
use chrono::{DateTime, Utc};
use priority_notify_common::ClientToken;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};
use uuid::Uuid;

const TOKEN_COLUMNS: &str =
    "id, user_id, token_hash, name, device_type, last_used_at, created_at, expires_at";

/// SQL implementation of the client token repository
#[derive(Debug, Clone)]
pub struct SqlClientTokenRepository {
    /// The database client
    db_client: DbClient,
}

impl SqlClientTokenRepository {
    /// Create a new SQL client token repository
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }
}

fn token_from_row(row: &AnyRow) -> Result<ClientToken, DbError> {
    let device_type: String = row.try_get("device_type")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(ClientToken {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_hash: row.try_get("token_hash")?,
        name: row.try_get("name")?,
        device_type: decode_enum("device_type", &device_type)?,
        last_used_at: decode_opt_ts("last_used_at", get_opt_text(row, "last_used_at")?)?,
        created_at: decode_ts("created_at", &created_at)?,
        expires_at: decode_opt_ts("expires_at", get_opt_text(row, "expires_at")?)?,
    })
}

impl ClientTokenRepository for SqlClientTokenRepository {
    async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing client token schema");

        let table = r#"
            CREATE TABLE IF NOT EXISTS client_tokens (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                token_hash TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                device_type TEXT NOT NULL,
                last_used_at TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT
            )
        "#;
        self.db_client.execute(table).await?;
        self.db_client
            .execute("CREATE INDEX IF NOT EXISTS ix_client_tokens_user_id ON client_tokens (user_id)")
            .await?;

        info!("Client token schema initialized successfully");
        Ok(())
    }

    async fn insert(&self, token: NewClientToken) -> Result<ClientToken, DbError> {
        debug!("Storing client token for user: {}", token.user_id);

        let stored = ClientToken {
            id: Uuid::new_v4().to_string(),
            user_id: token.user_id,
            token_hash: token.token_hash,
            name: token.name,
            device_type: token.device_type,
            last_used_at: None,
            created_at: Utc::now(),
            expires_at: token.expires_at,
        };

        let query = r#"
            INSERT INTO client_tokens (id, user_id, token_hash, name, device_type, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#;
        sqlx::query(query)
            .bind(stored.id.clone())
            .bind(stored.user_id.clone())
            .bind(stored.token_hash.clone())
            .bind(stored.name.clone())
            .bind(stored.device_type.as_str())
            .bind(encode_ts(stored.created_at))
            .bind(stored.expires_at.map(encode_ts))
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert client token: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        Ok(stored)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ClientToken>, DbError> {
        let query = format!(
            "SELECT {} FROM client_tokens WHERE user_id = $1 ORDER BY created_at DESC",
            TOKEN_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to list client tokens: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(token_from_row).collect()
    }

    async fn active_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ClientToken>, DbError> {
        let query = format!(
            "SELECT {} FROM client_tokens WHERE expires_at IS NULL OR expires_at > $1",
            TOKEN_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(encode_ts(now))
            .fetch_all(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to load client token candidates: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        rows.iter().map(token_from_row).collect()
    }

    async fn touch_last_used(&self, id: &str, at: DateTime<Utc>) -> Result<(), DbError> {
        sqlx::query("UPDATE client_tokens SET last_used_at = $1 WHERE id = $2")
            .bind(encode_ts(at))
            .bind(id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to update token last_used_at: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        Ok(())
    }

    async fn delete_for_user(&self, id: &str, user_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM client_tokens WHERE id = $1 AND user_id = $2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to delete client token: {}", e);
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
    use priority_notify_common::DeviceType;

    async fn setup() -> (SqlClientTokenRepository, String) {
        let client = DbClient::from_url("sqlite::memory:").await.expect("pool");
        let users = SqlUserRepository::new(client.clone());
        users.init_schema().await.expect("users schema");
        let tokens = SqlClientTokenRepository::new(client);
        tokens.init_schema().await.expect("tokens schema");
        let user = users
            .upsert_by_sub("sub-1", "a@example.com", "A")
            .await
            .expect("user");
        (tokens, user.id)
    }

    fn new_token(user_id: &str, hash: &str, expires_at: Option<DateTime<Utc>>) -> NewClientToken {
        NewClientToken {
            user_id: user_id.to_string(),
            token_hash: hash.to_string(),
            name: format!("token {}", hash),
            device_type: DeviceType::Gnome,
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let (repo, user_id) = setup().await;
        let first = repo.insert(new_token(&user_id, "h1", None)).await.unwrap();
        let second = repo.insert(new_token(&user_id, "h2", None)).await.unwrap();

        let listed = repo.list_for_user(&user_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
        assert_eq!(listed[0].device_type, DeviceType::Gnome);
        assert!(repo.list_for_user("someone-else").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_active_candidates_skip_expired() {
        let (repo, user_id) = setup().await;
        let now = Utc::now();
        repo.insert(new_token(&user_id, "live", None)).await.unwrap();
        repo.insert(new_token(&user_id, "later", Some(now + Duration::days(1))))
            .await
            .unwrap();
        repo.insert(new_token(&user_id, "gone", Some(now - Duration::days(1))))
            .await
            .unwrap();

        let mut hashes: Vec<String> = repo
            .active_candidates(now)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.token_hash)
            .collect();
        hashes.sort();
        assert_eq!(hashes, vec!["later".to_string(), "live".to_string()]);
    }

    #[tokio::test]
    async fn test_touch_and_delete_respect_owner() {
        let (repo, user_id) = setup().await;
        let token = repo.insert(new_token(&user_id, "h1", None)).await.unwrap();
        assert!(token.last_used_at.is_none());

        let used_at = Utc::now();
        repo.touch_last_used(&token.id, used_at).await.unwrap();
        let listed = repo.list_for_user(&user_id).await.unwrap();
        assert!(listed[0].last_used_at.is_some());

        assert!(!repo.delete_for_user(&token.id, "intruder").await.unwrap());
        assert!(repo.delete_for_user(&token.id, &user_id).await.unwrap());
        assert!(!repo.delete_for_user(&token.id, &user_id).await.unwrap());
    }
}
