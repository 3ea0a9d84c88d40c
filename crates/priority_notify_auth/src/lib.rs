//! Authentication for priority-notify
//!
//! Two kinds of credentials are accepted:
//!
//! - a signed session cookie, set after logging in through Authentik
//!   (OpenID Connect authorization code flow)
//! - a bearer token issued to a device through `/api/tokens`
//!
//! Handlers ask for the caller with the [`CurrentUser`] extractor (either
//! credential) or [`SessionUser`] (session only).
//!
//! # Example
//!
//! ```rust,no_run
//! use priority_notify_auth::{IdentityResolver, SessionCodec, TokenVerifier};
//! use priority_notify_db::{DbClient, SqlClientTokenRepository, SqlUserRepository};
//!
//! async fn resolver() -> Result<IdentityResolver, Box<dyn std::error::Error>> {
//!     let db = DbClient::from_url("sqlite::memory:").await?;
//!     let users = SqlUserRepository::new(db.clone());
//!     let tokens = TokenVerifier::new(SqlClientTokenRepository::new(db), users.clone(), 12);
//!     let sessions = SessionCodec::new("a-long-random-secret", 604800)?;
//!     Ok(IdentityResolver::new(sessions, tokens, users, "session", true))
//! }
//! ```

pub mod cookies;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod handlers;
pub mod identity;
pub mod oidc;
pub mod pending;
pub mod routes;
pub mod session;
pub mod token;

pub use handlers::AuthState;
pub use identity::{AuthError, Credentials, CurrentUser, IdentityResolver, SessionUser};
pub use oidc::{IdClaims, OidcClient, OidcError};
pub use pending::PendingStates;
pub use routes::routes;
pub use session::{SessionCodec, SessionError};
pub use token::{IssuedToken, TokenError, TokenVerifier};

#[cfg(feature = "openapi")]
pub mod openapi {
    pub use crate::doc::AuthApiDoc;
}
