#![allow(dead_code)]
use utoipa::OpenApi;

use crate::handlers::CreateTokenRequest;
use priority_notify_common::{DeviceType, FieldError, TokenCreatedResponse, TokenResponse, UserResponse};

#[utoipa::path(
    get,
    path = "/auth/login",
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 502, description = "Identity provider unavailable"),
        (status = 503, description = "No identity provider configured")
    ),
    tag = "Auth"
)]
fn doc_login_handler() {}

#[utoipa::path(
    get,
    path = "/auth/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code"),
        ("state" = Option<String>, Query, description = "State issued by /auth/login")
    ),
    responses(
        (status = 303, description = "Session cookie set, redirect to /. Unknown state redirects to /auth/login."),
        (status = 502, description = "Login failed at the identity provider")
    ),
    tag = "Auth"
)]
fn doc_callback_handler() {}

#[utoipa::path(
    get,
    path = "/auth/logout",
    responses((status = 303, description = "Session cookie cleared, redirect to /")),
    tag = "Auth"
)]
fn doc_logout_handler() {}

#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Not authenticated",
         example = json!({"error": {"message": "Not authenticated", "code": 401}}))
    ),
    tag = "Account"
)]
fn doc_me_handler() {}

#[utoipa::path(
    get,
    path = "/api/tokens",
    responses(
        (status = 200, description = "The caller's tokens, newest first", body = [TokenResponse]),
        (status = 401, description = "No valid session")
    ),
    tag = "Tokens"
)]
fn doc_list_tokens_handler() {}

#[utoipa::path(
    post,
    path = "/api/tokens",
    request_body(content = CreateTokenRequest, example = json!({
        "name": "Work laptop",
        "device_type": "gnome",
        "expires_at": "2030-01-01T00:00:00Z"
    })),
    responses(
        (status = 201, description = "Token created. The plaintext is only shown here.", body = TokenCreatedResponse),
        (status = 401, description = "No valid session"),
        (status = 422, description = "Validation failed",
         example = json!({"error": {"message": "Validation failed", "code": 422,
                                    "fields": [{"field": "name", "message": "is required"}]}}))
    ),
    tag = "Tokens"
)]
fn doc_create_token_handler() {}

#[utoipa::path(
    delete,
    path = "/api/tokens/{id}",
    params(("id" = String, Path, description = "Token id")),
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "Token not found")
    ),
    tag = "Tokens"
)]
fn doc_revoke_token_handler() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        doc_login_handler,
        doc_callback_handler,
        doc_logout_handler,
        doc_me_handler,
        doc_list_tokens_handler,
        doc_create_token_handler,
        doc_revoke_token_handler,
    ),
    components(
        schemas(
            CreateTokenRequest,
            TokenResponse,
            TokenCreatedResponse,
            UserResponse,
            DeviceType,
            FieldError,
        )
    ),
    tags(
        (name = "Auth", description = "Login through Authentik"),
        (name = "Account", description = "The authenticated user"),
        (name = "Tokens", description = "API client tokens for devices")
    )
)]
pub struct AuthApiDoc;
