//! OpenID Connect client for Authentik
//!
//! The discovery document and the signing keys are fetched lazily and cached
//! for `cache_ttl_secs`. An ID token signed with a key id that is not in the
//! cache forces one refetch before it is rejected.

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use priority_notify_common::{create_client, external_service_error, NotifyError};
use priority_notify_config::OidcConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Service name used in upstream error messages.
pub const PROVIDER_NAME: &str = "Authentik";

#[derive(Error, Debug)]
pub enum OidcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid provider URL: {0}")]
    Url(String),

    #[error("No signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("Signing key {0:?} names no usable algorithm")]
    UnsupportedKey(Option<String>),

    #[error("ID token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

impl From<OidcError> for NotifyError {
    fn from(err: OidcError) -> Self {
        external_service_error(PROVIDER_NAME, err)
    }
}

/// The parts of the provider metadata this service uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Identity claims read from a verified ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct IdClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl IdClaims {
    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or("")
    }

    /// `name`, then `preferred_username`, then empty.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.preferred_username.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug)]
struct ProviderMetadata {
    discovery: DiscoveryDocument,
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Talks to the identity provider on behalf of the login flow.
#[derive(Debug)]
pub struct OidcClient {
    config: OidcConfig,
    http: reqwest::Client,
    cache_ttl: Duration,
    cache: RwLock<Option<Arc<ProviderMetadata>>>,
}

impl OidcClient {
    pub fn new(config: OidcConfig) -> Result<Self, OidcError> {
        let http = create_client(priority_notify_common::http::client::DEFAULT_TIMEOUT_SECS, true)?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: OidcConfig, http: reqwest::Client) -> Self {
        let cache_ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            config,
            http,
            cache_ttl,
            cache: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    pub fn discovery_url(&self) -> String {
        format!(
            "{}/application/o/{}/.well-known/openid-configuration",
            self.config.issuer_url.trim_end_matches('/'),
            self.config.client_id
        )
    }

    /// The provider URL the browser is redirected to.
    pub async fn authorization_url(&self, state: &str) -> Result<String, OidcError> {
        let metadata = self.metadata().await?;
        let query = serde_urlencoded::to_string([
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", self.config.scopes.as_str()),
            ("state", state),
        ])
        .map_err(|e| OidcError::Url(e.to_string()))?;

        let endpoint = &metadata.discovery.authorization_endpoint;
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}{}", endpoint, separator, query))
    }

    /// Trade an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OidcError> {
        let metadata = self.metadata().await?;
        let url = metadata.discovery.token_endpoint.as_str();
        debug!("Exchanging authorization code at {}", url);

        let response = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(url, response)?;
        Ok(response.json().await?)
    }

    /// Verify an ID token's signature, issuer, audience and expiry.
    pub async fn validate_id_token(&self, id_token: &str) -> Result<IdClaims, OidcError> {
        let header = decode_header(id_token)?;
        let kid = header.kid.clone();

        let mut metadata = self.metadata().await?;
        let cached = find_key(&metadata.jwks, kid.as_deref()).cloned();
        let jwk = match cached {
            Some(jwk) => jwk,
            None => {
                info!("Signing key {:?} not cached, refreshing provider keys", kid);
                metadata = self.refresh().await?;
                find_key(&metadata.jwks, kid.as_deref())
                    .cloned()
                    .ok_or(OidcError::UnknownKey(kid))?
            }
        };

        let key = DecodingKey::from_jwk(&jwk)?;
        let mut validation = Validation::new(key_algorithm(&jwk)?);
        validation.set_issuer(&[metadata.discovery.issuer.as_str()]);
        validation.set_audience(&[self.config.client_id.as_str()]);

        Ok(decode::<IdClaims>(id_token, &key, &validation)?.claims)
    }

    async fn metadata(&self) -> Result<Arc<ProviderMetadata>, OidcError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                return Ok(cached.clone());
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<Arc<ProviderMetadata>, OidcError> {
        let discovery_url = self.discovery_url();
        let response = self.http.get(&discovery_url).send().await?;
        let discovery: DiscoveryDocument = check_status(&discovery_url, response)?.json().await?;

        let response = self.http.get(&discovery.jwks_uri).send().await?;
        let jwks: JwkSet = check_status(&discovery.jwks_uri, response)?.json().await?;
        debug!("Fetched {} provider signing keys", jwks.keys.len());

        let metadata = Arc::new(ProviderMetadata {
            discovery,
            jwks,
            fetched_at: Instant::now(),
        });
        *self.cache.write().await = Some(metadata.clone());
        Ok(metadata)
    }
}

fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response, OidcError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        warn!("Identity provider answered {} for {}", status, url);
        Err(OidcError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Match by key id, or take the only key when the token names none.
/// The algorithm a provider key signs with: its `alg`, or the usual
/// algorithm for its key type. The token header never chooses it.
fn key_algorithm(jwk: &Jwk) -> Result<Algorithm, OidcError> {
    let unsupported = || OidcError::UnsupportedKey(jwk.common.key_id.clone());
    if let Some(alg) = &jwk.common.key_algorithm {
        return format!("{:?}", alg).parse().map_err(|_| unsupported());
    }
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(Algorithm::RS256),
        AlgorithmParameters::OctetKey(_) => Ok(Algorithm::HS256),
        AlgorithmParameters::OctetKeyPair(_) => Ok(Algorithm::EdDSA),
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => Ok(Algorithm::ES256),
            EllipticCurve::P384 => Ok(Algorithm::ES384),
            _ => Err(unsupported()),
        },
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => jwks.find(kid),
        None if jwks.keys.len() == 1 => jwks.keys.first(),
        None => None,
    }
}
