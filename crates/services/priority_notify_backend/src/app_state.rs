// --- File: crates/services/priority_notify_backend/src/app_state.rs ---
use priority_notify_auth::{
    AuthState, IdentityResolver, OidcClient, OidcError, PendingStates, SessionCodec, SessionError,
    TokenVerifier,
};
use priority_notify_config::AppConfig;
use priority_notify_db::{
    DbClient, DbError, SqlClientTokenRepository, SqlNotificationRepository, SqlUserRepository,
};
use priority_notify_notifications::{EventBroker, NotificationsState};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Anything that stops the service from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] priority_notify_config::ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Session setup failed: {0}")]
    Session(#[from] SessionError),

    #[error("Identity provider client setup failed: {0}")]
    Oidc(#[from] OidcError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state that is shared across all routes.
///
/// Built once at startup. Each feature crate receives its own slice of it
/// through [`AppState::auth_state`] and [`AppState::notifications_state`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbClient,
    pub resolver: Arc<IdentityResolver>,
    pub broker: Arc<EventBroker>,
    /// `None` when the `oidc` section is missing
    pub oidc: Option<Arc<OidcClient>>,
    pub pending: Arc<PendingStates>,
}

/// Builder for AppState.
///
/// The database is required; the identity provider client is created from
/// the configuration unless one is supplied.
pub struct AppStateBuilder {
    config: Arc<AppConfig>,
    db: Option<DbClient>,
    oidc: Option<OidcClient>,
}

impl AppStateBuilder {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            db: None,
            oidc: None,
        }
    }

    /// Set the database client.
    pub fn with_db(mut self, db: DbClient) -> Self {
        self.db = Some(db);
        self
    }

    /// Use this identity provider client instead of building one.
    pub fn with_oidc_client(mut self, oidc: OidcClient) -> Self {
        self.oidc = Some(oidc);
        self
    }

    /// Build the AppState.
    pub async fn build(self) -> Result<AppState, StartupError> {
        let config = self.config;
        let db = match self.db {
            Some(db) => db,
            None => DbClient::from_config(&config.database).await?,
        };

        let users = SqlUserRepository::new(db.clone());
        let tokens = TokenVerifier::new(
            SqlClientTokenRepository::new(db.clone()),
            users.clone(),
            config.auth.token_hash_cost,
        );
        let sessions = SessionCodec::new(&config.auth.secret_key, config.auth.session_max_age_secs)?;
        let resolver = IdentityResolver::new(
            sessions,
            tokens,
            users,
            config.auth.session_cookie.clone(),
            config.auth.cookie_secure,
        );

        let oidc = match (self.oidc, config.oidc.as_ref()) {
            (Some(client), _) => Some(client),
            (None, Some(oidc_config)) => Some(OidcClient::new(oidc_config.clone())?),
            (None, None) => None,
        };
        let state_ttl = oidc
            .as_ref()
            .map_or(600, |client| client.config().state_ttl_secs);
        info!(
            oidc = oidc.is_some(),
            channel_capacity = config.stream.channel_capacity,
            "Application state ready"
        );

        Ok(AppState {
            broker: Arc::new(EventBroker::new(config.stream.channel_capacity)),
            pending: Arc::new(PendingStates::new(Duration::from_secs(state_ttl))),
            oidc: oidc.map(Arc::new),
            resolver: Arc::new(resolver),
            db,
            config,
        })
    }
}

impl AppState {
    pub fn builder(config: Arc<AppConfig>) -> AppStateBuilder {
        AppStateBuilder::new(config)
    }

    /// Create the state from configuration alone.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, StartupError> {
        AppStateBuilder::new(config).build().await
    }

    pub fn auth_state(&self) -> AuthState {
        AuthState {
            resolver: self.resolver.clone(),
            oidc: self.oidc.clone(),
            pending: self.pending.clone(),
        }
    }

    pub fn notifications_state(&self) -> NotificationsState {
        NotificationsState {
            resolver: self.resolver.clone(),
            notifications: SqlNotificationRepository::new(self.db.clone()),
            broker: self.broker.clone(),
            heartbeat: Duration::from_secs(self.config.stream.heartbeat_secs.max(1)),
        }
    }
}
