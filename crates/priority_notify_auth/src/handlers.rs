//! HTTP handlers for login, logout, the current user and API client tokens
//!
//! Login runs the OpenID Connect authorization code flow against Authentik
//! and ends with a signed session cookie. Token management requires that
//! session; a bearer token cannot mint or revoke other tokens.

use axum::{
    extract::{FromRef, Path, Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use priority_notify_common::{
    config_error, not_found, DeviceType, FieldError, JsonBody, NotifyError, TokenCreatedResponse,
    TokenResponse, UserResponse,
};
use priority_notify_db::{ClientTokenRepository, NewClientToken, UserRepository};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cookies::{clear_session_cookie, session_cookie};
use crate::identity::{CurrentUser, IdentityResolver, SessionUser};
use crate::oidc::OidcClient;
use crate::pending::PendingStates;

/// Longest accepted token name.
pub const MAX_TOKEN_NAME_LEN: usize = 255;

/// Shared state for the auth handlers
#[derive(Clone)]
pub struct AuthState {
    pub resolver: Arc<IdentityResolver>,
    /// `None` when no identity provider is configured
    pub oidc: Option<Arc<OidcClient>>,
    pub pending: Arc<PendingStates>,
}

impl FromRef<AuthState> for Arc<IdentityResolver> {
    fn from_ref(state: &AuthState) -> Self {
        state.resolver.clone()
    }
}

impl AuthState {
    fn oidc(&self) -> Result<&OidcClient, NotifyError> {
        self.oidc
            .as_deref()
            .ok_or_else(|| config_error("OpenID Connect login is not configured"))
    }
}

/// Query string the identity provider sends back to the callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Request body for creating an API client token
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTokenRequest {
    /// Human readable label, 1 to 255 characters
    pub name: Option<String>,
    /// One of `android`, `gnome`, `other`. Defaults to `other`.
    pub device_type: Option<String>,
    /// RFC 3339 timestamp in the future. No expiry when omitted.
    pub expires_at: Option<String>,
}

/// A token request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTokenRequest {
    pub name: String,
    pub device_type: DeviceType,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateTokenRequest {
    /// Check every field and report all problems at once.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidTokenRequest, NotifyError> {
        let mut errors = Vec::new();

        let name = self.name.unwrap_or_default();
        let name_len = name.chars().count();
        if name.trim().is_empty() {
            errors.push(FieldError::new("name", "is required"));
        } else if name_len > MAX_TOKEN_NAME_LEN {
            errors.push(FieldError::new(
                "name",
                format!("must be at most {} characters", MAX_TOKEN_NAME_LEN),
            ));
        }

        let device_type = match self.device_type.as_deref() {
            None => DeviceType::default(),
            Some(raw) => raw.parse::<DeviceType>().unwrap_or_else(|e| {
                errors.push(FieldError::new("device_type", e.to_string()));
                DeviceType::default()
            }),
        };

        let expires_at = match self.expires_at.as_deref() {
            None => None,
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(at) if at.with_timezone(&Utc) > now => Some(at.with_timezone(&Utc)),
                Ok(_) => {
                    errors.push(FieldError::new("expires_at", "must be in the future"));
                    None
                }
                Err(_) => {
                    errors.push(FieldError::new("expires_at", "must be an RFC 3339 timestamp"));
                    None
                }
            },
        };

        if errors.is_empty() {
            Ok(ValidTokenRequest {
                name,
                device_type,
                expires_at,
            })
        } else {
            Err(NotifyError::Validation(errors))
        }
    }
}

/// Start the login flow by redirecting to the identity provider.
pub async fn login_handler(State(state): State<AuthState>) -> Result<Redirect, NotifyError> {
    let oidc = state.oidc()?;
    let login_state = state.pending.issue();
    let url = oidc.authorization_url(&login_state).await?;
    Ok(Redirect::to(&url))
}

/// Finish the login flow and set the session cookie.
///
/// An unknown, reused or expired `state` restarts the flow.
pub async fn callback_handler(
    State(state): State<AuthState>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, NotifyError> {
    let oidc = state.oidc()?;

    let known_state = params
        .state
        .as_deref()
        .is_some_and(|s| state.pending.consume(s));
    let code = match (known_state, params.code) {
        (true, Some(code)) => code,
        _ => {
            warn!("Login callback with unknown state or missing code, restarting login");
            return Ok(Redirect::to("/auth/login").into_response());
        }
    };

    let tokens = oidc.exchange_code(&code).await?;
    let claims = oidc.validate_id_token(&tokens.id_token).await?;

    let resolver = &state.resolver;
    let user = resolver
        .users()
        .upsert_by_sub(&claims.sub, claims.email(), claims.display_name())
        .await?;
    info!(user_id = %user.id, email = %user.email, "User logged in");

    let cookie = session_cookie(
        resolver.cookie_name(),
        &resolver.sessions().create_session(&user.id),
        resolver.sessions().max_age_secs(),
        resolver.cookie_secure(),
    );
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// Remove the session cookie. No server-side state is touched.
pub async fn logout_handler(State(state): State<AuthState>) -> impl IntoResponse {
    let resolver = &state.resolver;
    let cookie = clear_session_cookie(resolver.cookie_name(), resolver.cookie_secure());
    ([(SET_COOKIE, cookie)], Redirect::to("/"))
}

/// The authenticated user.
pub async fn me_handler(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// The caller's tokens, newest first. Secrets are never included.
pub async fn list_tokens_handler(
    State(state): State<AuthState>,
    SessionUser(user): SessionUser,
) -> Result<Json<Vec<TokenResponse>>, NotifyError> {
    let tokens = state
        .resolver
        .tokens()
        .tokens()
        .list_for_user(&user.id)
        .await?;
    Ok(Json(tokens.into_iter().map(TokenResponse::from).collect()))
}

/// Create a token. The plaintext appears in this response only.
pub async fn create_token_handler(
    State(state): State<AuthState>,
    SessionUser(user): SessionUser,
    JsonBody(request): JsonBody<CreateTokenRequest>,
) -> Result<(StatusCode, Json<TokenCreatedResponse>), NotifyError> {
    let request = request.validate(Utc::now())?;
    let verifier = state.resolver.tokens();

    let issued = verifier.issue().await?;
    let stored = verifier
        .tokens()
        .insert(NewClientToken {
            user_id: user.id.clone(),
            token_hash: issued.hash,
            name: request.name,
            device_type: request.device_type,
            expires_at: request.expires_at,
        })
        .await?;
    info!(token_id = %stored.id, user_id = %user.id, "Client token created");

    Ok((
        StatusCode::CREATED,
        Json(TokenCreatedResponse {
            details: stored.into(),
            token: issued.plaintext,
        }),
    ))
}

/// Revoke one of the caller's tokens.
pub async fn revoke_token_handler(
    State(state): State<AuthState>,
    SessionUser(user): SessionUser,
    Path(token_id): Path<String>,
) -> Result<StatusCode, NotifyError> {
    let deleted = state
        .resolver
        .tokens()
        .tokens()
        .delete_for_user(&token_id, &user.id)
        .await?;
    if !deleted {
        return Err(not_found("Token"));
    }
    info!(token_id = %token_id, user_id = %user.id, "Client token revoked");
    Ok(StatusCode::NO_CONTENT)
}
