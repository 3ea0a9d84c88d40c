use axum::{
    routing::{delete, get},
    Router,
};
use tracing::info;

use crate::handlers::{
    callback_handler, create_token_handler, list_tokens_handler, login_handler, logout_handler,
    me_handler, revoke_token_handler, AuthState,
};

/// Create the login flow and account routes
///
/// The `/auth/*` routes are browser redirects; the `/api/*` routes answer
/// JSON. Token management only accepts a session cookie.
///
/// # Arguments
///
/// * `state` - The resolver, the optional OIDC client and the pending login states
///
/// # Returns
///
/// An Axum router with the auth endpoints
pub fn routes(state: AuthState) -> Router {
    if state.oidc.is_none() {
        info!("No OpenID Connect provider configured, login routes will answer 503");
    }

    Router::new()
        .route("/auth/login", get(login_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/auth/logout", get(logout_handler))
        .route("/api/me", get(me_handler))
        .route(
            "/api/tokens",
            get(list_tokens_handler).post(create_token_handler),
        )
        .route("/api/tokens/{id}", delete(revoke_token_handler))
        .with_state(state)
}
