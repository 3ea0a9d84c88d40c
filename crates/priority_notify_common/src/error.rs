// --- File: crates/priority_notify_common/src/error.rs ---
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Message shown for every credential failure. Missing, malformed and expired
/// credentials all look the same to the caller.
pub const UNAUTHENTICATED_MESSAGE: &str = "Not authenticated";

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The error type returned by every priority-notify handler.
///
/// Crate-local errors convert into this enum so handlers can use `?` and
/// still produce a consistent JSON body.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No valid session or bearer token.
    #[error("{}", UNAUTHENTICATED_MESSAGE)]
    Unauthenticated,

    /// Resource absent or owned by someone else.
    #[error("{0} not found")]
    NotFound(String),

    /// Request body or query failed validation.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Malformed request outside of body validation.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The identity provider could not be reached or answered unexpectedly.
    #[error("External service error: {service} - {message}")]
    Upstream { service: String, message: String },

    /// A feature is used without its configuration section.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for NotifyError {
    fn status_code(&self) -> u16 {
        match self {
            NotifyError::Unauthenticated => 401,
            NotifyError::NotFound(_) => 404,
            NotifyError::Validation(_) => 422,
            NotifyError::BadRequest(_) => 400,
            NotifyError::Upstream { .. } => 502,
            NotifyError::Config(_) => 503,
            NotifyError::Database(_) => 500,
            NotifyError::Internal(_) => 500,
        }
    }
}

impl NotifyError {
    /// The message that is safe to send to a client.
    ///
    /// Storage and internal failures are reduced to a generic text; their
    /// details only go to the log.
    pub fn public_message(&self) -> String {
        match self {
            NotifyError::Database(_) | NotifyError::Internal(_) => {
                "Internal server error".to_string()
            }
            NotifyError::Upstream { service, .. } => {
                format!("Login failed: {} is unavailable, please try again", service)
            }
            other => other.to_string(),
        }
    }
}

// Common error conversions
impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        internal_error(err)
    }
}

// Utility functions for error handling
pub fn not_found<T: fmt::Display>(what: T) -> NotifyError {
    NotifyError::NotFound(what.to_string())
}

pub fn validation_error(field: &str, message: impl Into<String>) -> NotifyError {
    NotifyError::Validation(vec![FieldError::new(field, message)])
}

pub fn config_error<T: fmt::Display>(message: T) -> NotifyError {
    NotifyError::Config(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service: &str, message: T) -> NotifyError {
    NotifyError::Upstream {
        service: service.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> NotifyError {
    NotifyError::Internal(message.to_string())
}
