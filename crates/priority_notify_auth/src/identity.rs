//! Resolving the caller of a request
//!
//! Browser requests carry a signed session cookie, devices carry a bearer
//! token. Every failure to authenticate looks the same to the caller.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use priority_notify_common::{NotifyError, User};
use priority_notify_db::{DbError, SqlUserRepository, UserRepository};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::cookies::{bearer_token, cookie_value};
use crate::session::SessionCodec;
use crate::token::{TokenError, TokenVerifier};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Storage(#[from] DbError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<AuthError> for NotifyError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => NotifyError::Unauthenticated,
            AuthError::Storage(db) => db.into(),
            AuthError::Token(token) => token.into(),
        }
    }
}

/// Credentials found on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub session: Option<String>,
    pub bearer: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Self {
        Self {
            session: cookie_value(headers, cookie_name),
            bearer: bearer_token(headers),
        }
    }
}

/// Turns request credentials into a stored user.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    sessions: SessionCodec,
    tokens: TokenVerifier,
    users: SqlUserRepository,
    cookie_name: String,
    cookie_secure: bool,
}

impl IdentityResolver {
    pub fn new(
        sessions: SessionCodec,
        tokens: TokenVerifier,
        users: SqlUserRepository,
        cookie_name: impl Into<String>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            sessions,
            tokens,
            users,
            cookie_name: cookie_name.into(),
            cookie_secure,
        }
    }

    pub fn sessions(&self) -> &SessionCodec {
        &self.sessions
    }

    pub fn tokens(&self) -> &TokenVerifier {
        &self.tokens
    }

    pub fn users(&self) -> &SqlUserRepository {
        &self.users
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    /// Accept a valid session first, then a valid bearer token.
    ///
    /// A session that fails validation does not stop the bearer token from
    /// being tried.
    pub async fn resolve_any(&self, credentials: &Credentials) -> Result<User, AuthError> {
        if let Some(user) = self.user_from_session(credentials.session.as_deref()).await? {
            return Ok(user);
        }
        if let Some(raw) = credentials.bearer.as_deref() {
            if let Some(user) = self.tokens.verify(raw).await? {
                return Ok(user);
            }
            debug!("Bearer token did not match any active token");
        }
        Err(AuthError::Unauthenticated)
    }

    /// Accept only a valid session. Bearer tokens are ignored.
    pub async fn resolve_session_only(&self, credentials: &Credentials) -> Result<User, AuthError> {
        self.user_from_session(credentials.session.as_deref())
            .await?
            .ok_or(AuthError::Unauthenticated)
    }

    async fn user_from_session(&self, value: Option<&str>) -> Result<Option<User>, AuthError> {
        let Some(value) = value else {
            return Ok(None);
        };
        match self.sessions.validate_session(value) {
            Ok(user_id) => Ok(self.users.find_by_id(&user_id).await?),
            Err(e) => {
                debug!("Ignoring session cookie: {}", e);
                Ok(None)
            }
        }
    }
}

/// The caller, authenticated by session or bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// The caller, authenticated by session only.
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<IdentityResolver>: FromRef<S>,
{
    type Rejection = NotifyError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<IdentityResolver>::from_ref(state);
        let credentials = Credentials::from_headers(&parts.headers, resolver.cookie_name());
        Ok(CurrentUser(resolver.resolve_any(&credentials).await?))
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    Arc<IdentityResolver>: FromRef<S>,
{
    type Rejection = NotifyError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = Arc::<IdentityResolver>::from_ref(state);
        let credentials = Credentials::from_headers(&parts.headers, resolver.cookie_name());
        Ok(SessionUser(resolver.resolve_session_only(&credentials).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priority_notify_common::DeviceType;
    use priority_notify_db::{ClientTokenRepository, DbClient, NewClientToken, SqlClientTokenRepository};

    struct Fixture {
        resolver: IdentityResolver,
        user: User,
        session: String,
        token: String,
    }

    async fn fixture() -> Fixture {
        let client = DbClient::from_url("sqlite::memory:").await.unwrap();
        priority_notify_db::init_schemas(&client).await.unwrap();
        let users = SqlUserRepository::new(client.clone());
        let user = users
            .upsert_by_sub("sub-1", "a@example.com", "Alice")
            .await
            .unwrap();
        let tokens = TokenVerifier::new(SqlClientTokenRepository::new(client), users.clone(), 4);
        let issued = tokens.issue().await.unwrap();
        tokens
            .tokens()
            .insert(NewClientToken {
                user_id: user.id.clone(),
                token_hash: issued.hash,
                name: "phone".to_string(),
                device_type: DeviceType::Android,
                expires_at: None,
            })
            .await
            .unwrap();

        let sessions = SessionCodec::new("identity-secret", 3600).unwrap();
        let session = sessions.create_session(&user.id);
        let resolver = IdentityResolver::new(sessions, tokens, users, "session", false);
        Fixture {
            resolver,
            user,
            session,
            token: issued.plaintext,
        }
    }

    fn creds(session: Option<&str>, bearer: Option<&str>) -> Credentials {
        Credentials {
            session: session.map(str::to_string),
            bearer: bearer.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_resolve_any_accepts_session_or_token() {
        let f = fixture().await;
        let by_session = f.resolver.resolve_any(&creds(Some(&f.session), None)).await.unwrap();
        assert_eq!(by_session.id, f.user.id);
        let by_token = f.resolver.resolve_any(&creds(None, Some(&f.token))).await.unwrap();
        assert_eq!(by_token.id, f.user.id);
    }

    #[tokio::test]
    async fn test_session_wins_over_another_users_token() {
        let f = fixture().await;
        let bob = f
            .resolver
            .users()
            .upsert_by_sub("sub-2", "b@example.com", "Bob")
            .await
            .unwrap();
        let bob_session = f.resolver.sessions().create_session(&bob.id);

        let user = f
            .resolver
            .resolve_any(&creds(Some(&bob_session), Some(&f.token)))
            .await
            .unwrap();
        assert_eq!(user.id, bob.id);
    }

    #[tokio::test]
    async fn test_invalid_session_falls_through_to_token() {
        let f = fixture().await;
        let user = f
            .resolver
            .resolve_any(&creds(Some("garbage"), Some(&f.token)))
            .await
            .unwrap();
        assert_eq!(user.id, f.user.id);
    }

    #[tokio::test]
    async fn test_missing_or_invalid_credentials_are_rejected() {
        let f = fixture().await;
        for c in [
            creds(None, None),
            creds(Some("garbage"), None),
            creds(None, Some("wrong-token")),
        ] {
            assert!(matches!(
                f.resolver.resolve_any(&c).await,
                Err(AuthError::Unauthenticated)
            ));
        }
    }

    #[tokio::test]
    async fn test_session_only_ignores_bearer_tokens() {
        let f = fixture().await;
        assert!(matches!(
            f.resolver.resolve_session_only(&creds(None, Some(&f.token))).await,
            Err(AuthError::Unauthenticated)
        ));
        let user = f
            .resolver
            .resolve_session_only(&creds(Some(&f.session), None))
            .await
            .unwrap();
        assert_eq!(user.id, f.user.id);
    }

    #[tokio::test]
    async fn test_session_for_unknown_user_is_rejected() {
        let f = fixture().await;
        let orphan = f.resolver.sessions().create_session("no-such-user");
        assert!(matches!(
            f.resolver.resolve_any(&creds(Some(&orphan), None)).await,
            Err(AuthError::Unauthenticated)
        ));
    }
}
