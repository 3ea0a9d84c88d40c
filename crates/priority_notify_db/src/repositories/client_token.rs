//! Repository for API client tokens
//!
//! Tokens are stored as bcrypt hashes, so there is no lookup by secret.
//! Verification loads every active candidate and compares each hash.

use crate::error::DbError;
use chrono::{DateTime, Utc};
use priority_notify_common::{ClientToken, DeviceType};

/// Everything needed to store a freshly issued token.
#[derive(Debug, Clone)]
pub struct NewClientToken {
    pub user_id: String,
    pub token_hash: String,
    pub name: String,
    pub device_type: DeviceType,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Repository for API client tokens
pub trait ClientTokenRepository {
    /// Create the `client_tokens` table and its index if they do not exist.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Store a new token.
    ///
    /// # Returns
    ///
    /// The stored token with its id and creation time set
    fn insert(
        &self,
        token: NewClientToken,
    ) -> impl std::future::Future<Output = Result<ClientToken, DbError>> + Send;

    /// All tokens owned by a user, newest first.
    fn list_for_user(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ClientToken>, DbError>> + Send;

    /// Every token that has no expiry or expires after `now`.
    fn active_candidates(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<ClientToken>, DbError>> + Send;

    /// Record a successful use of a token.
    fn touch_last_used(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Delete a token if it belongs to `user_id`.
    ///
    /// # Returns
    ///
    /// `true` if a token was deleted, `false` if none matched
    fn delete_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<bool, DbError>> + Send;
}
