//! Repository for users
//!
//! Users are created and refreshed by the login flow and looked up on every
//! authenticated request.

use crate::error::DbError;
use priority_notify_common::User;

/// Repository for users
pub trait UserRepository {
    /// Create the `users` table if it does not exist.
    fn init_schema(&self) -> impl std::future::Future<Output = Result<(), DbError>> + Send;

    /// Find a user by internal id.
    fn find_by_id(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, DbError>> + Send;

    /// Find a user by the identity provider subject.
    fn find_by_sub(
        &self,
        sub: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, DbError>> + Send;

    /// Insert a user for `sub`, or refresh email and name and bump
    /// `last_login_at` if the subject is already known.
    ///
    /// # Returns
    ///
    /// The stored user after the write
    fn upsert_by_sub(
        &self,
        sub: &str,
        email: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<User, DbError>> + Send;
}
