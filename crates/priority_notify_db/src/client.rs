//! Database client for priority-notify
//!
//! A thin wrapper around an SQLx `Any` pool so the repositories do not care
//! which backend is configured.

use crate::error::DbError;
use priority_notify_config::DatabaseConfig;
use sqlx::pool::PoolOptions;
use sqlx::Pool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

/// Database client for priority-notify
#[derive(Debug, Clone)]
pub struct DbClient {
    /// The database connection pool
    pool: Pool<sqlx::Any>,
}

impl DbClient {
    /// Create a new database client from a database configuration
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    ///
    /// * The database URL is empty or invalid
    /// * The database connection fails
    pub async fn from_config(db_config: &DatabaseConfig) -> Result<Self, DbError> {
        Self::from_url(&db_config.url).await
    }

    /// Create a new database client from a database URL
    ///
    /// # Arguments
    ///
    /// * `db_url` - The database URL, e.g. `sqlite:data/priority_notify.db` or `sqlite::memory:`
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    ///
    /// * The database URL is invalid
    /// * The database connection fails
    pub async fn from_url(db_url: &str) -> Result<Self, DbError> {
        if db_url.is_empty() {
            return Err(DbError::UrlError("Database URL is empty".to_string()));
        }

        let pool = Self::create_pool(db_url).await?;
        Ok(Self { pool })
    }

    /// Create a connection pool
    ///
    /// In-memory SQLite databases live and die with their connection, so they
    /// get a single connection that is never recycled.
    async fn create_pool(db_url: &str) -> Result<Pool<sqlx::Any>, DbError> {
        debug!("Creating database pool with URL: {}", db_url);

        // Register the compiled-in drivers with the "any" driver
        sqlx::any::install_default_drivers();

        let in_memory = is_sqlite_memory_url(db_url);
        let pool_options = if in_memory {
            PoolOptions::<sqlx::Any>::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            PoolOptions::<sqlx::Any>::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .idle_timeout(Duration::from_secs(600))
        };

        if let Some(db_path) = sqlite_file_path(db_url) {
            ensure_sqlite_file(db_path)?;
        }

        let options = sqlx::any::AnyConnectOptions::from_str(db_url)
            .map_err(|e| DbError::UrlError(e.to_string()))?;
        let pool = pool_options.connect_with(options).await.map_err(|e| {
            error!("Failed to create database pool: {}", e);
            DbError::PoolError(e.to_string())
        })?;

        info!("Database pool created successfully");
        Ok(pool)
    }

    /// Get the database connection pool
    pub fn pool(&self) -> &Pool<sqlx::Any> {
        &self.pool
    }

    /// Execute a statement that returns no rows
    ///
    /// # Returns
    ///
    /// The number of rows affected
    pub async fn execute(&self, query: &str) -> Result<u64, DbError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map(|r| r.rows_affected())
            .map_err(|e| DbError::QueryError(e.to_string()))
    }
}

impl std::fmt::Display for DbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbClient")
    }
}

fn is_sqlite_memory_url(db_url: &str) -> bool {
    db_url.starts_with("sqlite:") && db_url.contains(":memory:")
}

/// The file behind a file-backed SQLite URL, if any.
///
/// Handles both `sqlite:example.db` and `sqlite://example.db`; query strings are ignored.
fn sqlite_file_path(db_url: &str) -> Option<&str> {
    if !db_url.starts_with("sqlite:") || is_sqlite_memory_url(db_url) {
        return None;
    }
    let rest = db_url
        .strip_prefix("sqlite://")
        .or_else(|| db_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}

/// `AnyConnectOptions` cannot set `create_if_missing`, so the file and its
/// directory are created up front.
fn ensure_sqlite_file(db_path: &str) -> Result<(), DbError> {
    let path = Path::new(db_path);
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("Creating directory for SQLite database: {:?}", dir);
            std::fs::create_dir_all(dir).map_err(|e| {
                error!("Failed to create directory for SQLite database: {}", e);
                DbError::PoolError(format!("Failed to create directory: {}", e))
            })?;
        }
    }
    if !path.exists() {
        debug!("Creating empty SQLite database file: {}", db_path);
        std::fs::File::create(path).map_err(|e| {
            error!("Failed to create SQLite database file: {}", e);
            DbError::PoolError(format!("Failed to create database file: {}", e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(sqlite_file_path("sqlite:data/app.db"), Some("data/app.db"));
        assert_eq!(
            sqlite_file_path("sqlite://data/app.db?mode=rwc"),
            Some("data/app.db")
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://localhost/notify"), None);
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let err = DbClient::from_url("").await.unwrap_err();
        assert!(matches!(err, DbError::UrlError(_)));
    }

    #[tokio::test]
    async fn test_memory_database_keeps_its_tables() {
        let client = DbClient::from_url("sqlite::memory:").await.expect("pool");
        client
            .execute("CREATE TABLE probe (id TEXT PRIMARY KEY)")
            .await
            .expect("create");
        // same connection, so the table is still there
        assert_eq!(
            client
                .execute("INSERT INTO probe (id) VALUES ('a')")
                .await
                .expect("insert"),
            1
        );
    }
}
