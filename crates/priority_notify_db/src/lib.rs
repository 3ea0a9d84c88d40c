//! Database integration for priority-notify
//!
//! This crate holds the SQLx pool and the repositories for users, API client
//! tokens and notifications. SQLite is the default backend; PostgreSQL can be
//! enabled with the `postgres` feature.
//!
//! # Example
//!
//! ```rust,no_run
//! use priority_notify_db::{DbClient, NotificationRepository, SqlNotificationRepository};
//!
//! async fn setup_db() -> Result<(), Box<dyn std::error::Error>> {
//!     let db_client = DbClient::from_url("sqlite:data/priority_notify.db").await?;
//!     let notifications = SqlNotificationRepository::new(db_client);
//!     notifications.init_schema().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod repositories;

// Re-export the client and repositories for ease of use
pub use client::DbClient;
pub use error::DbError;
pub use repositories::{
    ClientTokenRepository, NewClientToken, NewNotification, NotificationFilter,
    NotificationRepository, SqlClientTokenRepository, SqlNotificationRepository,
    SqlUserRepository, UserRepository,
};

/// Create every table in dependency order.
///
/// # Errors
///
/// Returns the first schema statement that fails.
pub async fn init_schemas(db_client: &DbClient) -> Result<(), DbError> {
    SqlUserRepository::new(db_client.clone()).init_schema().await?;
    SqlClientTokenRepository::new(db_client.clone())
        .init_schema()
        .await?;
    SqlNotificationRepository::new(db_client.clone())
        .init_schema()
        .await?;
    Ok(())
}
