// --- File: crates/priority_notify_config/src/models.rs ---

use serde::{Deserialize, Serialize};

/// Secret used when nothing else is configured. Startup logs a warning when it is still in use.
pub const DEFAULT_SECRET_KEY: &str = "change-me-to-a-random-secret";

/// Seven days, the lifetime of a browser session.
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Accepted `Host` header values. Empty means any host is accepted.
    pub allowed_hosts: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_hosts: Vec::new(),
        }
    }
}

// --- Database Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String, // e.g. DATABASE_URL or PRIORITY_NOTIFY__DATABASE__URL
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:data/priority_notify.db".to_string(),
        }
    }
}

// --- Session and token settings ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Key for signing session cookies (SECRET_KEY).
    pub secret_key: String,
    /// Name of the session cookie.
    pub session_cookie: String,
    pub session_max_age_secs: u64,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
    /// bcrypt cost used when hashing API tokens.
    pub token_hash_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            session_cookie: "session".to_string(),
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE_SECS,
            cookie_secure: false,
            token_hash_cost: 12,
        }
    }
}

// --- OpenID Connect provider (Authentik) ---
// client_secret is usually supplied through AUTHENTIK_CLIENT_SECRET.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OidcConfig {
    pub issuer_url: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    /// How long the discovery document and JWKS are trusted before refetching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// How long a login `state` value stays redeemable.
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
}

fn default_scopes() -> String {
    "openid email profile".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_state_ttl_secs() -> u64 {
    600
}

// --- Live stream settings ---
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StreamConfig {
    pub heartbeat_secs: u64,
    /// Per-subscriber queue length before events are dropped for that subscriber.
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 30,
            channel_capacity: 256,
        }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub stream: StreamConfig,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub oidc: Option<OidcConfig>,

    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory served at `/static` and as the fallback for unknown paths.
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            stream: StreamConfig::default(),
            oidc: None,
            cors_origins: Vec::new(),
            log_level: default_log_level(),
            static_dir: None,
        }
    }
}

impl AppConfig {
    /// True while the signing key is still the shipped placeholder.
    pub fn uses_default_secret(&self) -> bool {
        self.auth.secret_key == DEFAULT_SECRET_KEY
    }
}
