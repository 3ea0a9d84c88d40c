// --- File: crates/priority_notify_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod models; // Data structures and models

// Re-export error types and utilities for easier access
pub use error::{
    config_error, external_service_error, internal_error, not_found, validation_error, FieldError,
    HttpStatusCode, NotifyError, UNAUTHENTICATED_MESSAGE,
};

// Re-export HTTP utilities for easier access
pub use http::{
    client::create_client,
    extract::{JsonBody, QueryParams},
    IntoHttpResponse,
};

// Re-export logging utilities for easier access
pub use logging::{init_with_level, parse_level};

pub use models::{
    ClientToken, DeviceType, Notification, Page, Priority, Status, TokenCreatedResponse,
    TokenResponse, User, UserResponse,
};
