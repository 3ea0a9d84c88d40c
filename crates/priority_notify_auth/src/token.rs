//! API client tokens
//!
//! A token is 32 random bytes, URL-safe base64 encoded. Only its bcrypt hash
//! is stored; the plaintext is handed out once, at creation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use priority_notify_common::{internal_error, NotifyError, User};
use priority_notify_db::{
    ClientTokenRepository, DbError, SqlClientTokenRepository, SqlUserRepository, UserRepository,
};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, warn};

/// Number of random bytes in a token before encoding.
pub const TOKEN_BYTES: usize = 32;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Storage(#[from] DbError),
}

impl From<TokenError> for NotifyError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Storage(db) => db.into(),
            other => internal_error(other),
        }
    }
}

/// A freshly generated token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Returned to the caller once and never stored
    pub plaintext: String,
    pub hash: String,
}

/// Issues new tokens and resolves presented ones back to their owner.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    tokens: SqlClientTokenRepository,
    users: SqlUserRepository,
    cost: u32,
}

impl TokenVerifier {
    pub fn new(tokens: SqlClientTokenRepository, users: SqlUserRepository, cost: u32) -> Self {
        Self {
            tokens,
            users,
            cost,
        }
    }

    pub fn tokens(&self) -> &SqlClientTokenRepository {
        &self.tokens
    }

    /// Generate a token and its hash.
    ///
    /// Hashing is CPU bound, so it runs on the blocking pool.
    pub async fn issue(&self) -> Result<IssuedToken, TokenError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let plaintext = URL_SAFE_NO_PAD.encode(bytes);

        let cost = self.cost;
        let to_hash = plaintext.clone();
        let hash = tokio::task::spawn_blocking(move || bcrypt::hash(to_hash, cost))
            .await
            .map_err(|e| TokenError::Worker(e.to_string()))??;

        Ok(IssuedToken { plaintext, hash })
    }

    /// Resolve a presented token to its owner.
    ///
    /// Every unexpired token is compared until one matches. A match updates
    /// `last_used_at`.
    ///
    /// # Returns
    ///
    /// The owner, or `None` if nothing matched
    pub async fn verify(&self, raw: &str) -> Result<Option<User>, TokenError> {
        if raw.is_empty() {
            return Ok(None);
        }

        let now = Utc::now();
        let candidates = self.tokens.active_candidates(now).await?;
        debug!("Checking bearer token against {} candidates", candidates.len());

        let raw = raw.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            candidates.into_iter().find(|candidate| {
                bcrypt::verify(&raw, &candidate.token_hash).unwrap_or_else(|e| {
                    warn!("Unreadable hash for token {}: {}", candidate.id, e);
                    false
                })
            })
        })
        .await
        .map_err(|e| TokenError::Worker(e.to_string()))?;

        let Some(token) = matched else {
            return Ok(None);
        };

        self.tokens.touch_last_used(&token.id, now).await?;
        Ok(self.users.find_by_id(&token.user_id).await?)
    }
}
