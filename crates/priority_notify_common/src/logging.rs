//! Logging utilities for priority-notify.
//!
//! Every binary and test calls into this module instead of building its own
//! subscriber, so log output looks the same everywhere.

use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber with a specific log level.
///
/// # Examples
///
/// ```
/// use priority_notify_common::logging;
///
/// logging::init_with_level(logging::parse_level("debug"));
/// ```
///
/// `RUST_LOG` is honoured on top of the `priority_notify=<level>` directive.
/// Calling this more than once is harmless; later calls are ignored.
///
/// # Arguments
///
/// * `level` - The minimum log level for priority-notify crates.
pub fn init_with_level(level: Level) {
    let mut filter = EnvFilter::from_default_env();
    match format!("priority_notify={}", level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("invalid log directive: {}", e),
    }

    // try_init: a global subscriber may already be set (tests, embedding)
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Parse a level name such as `"INFO"` or `"debug"`.
///
/// Unknown names fall back to INFO with a warning, matching how the service
/// behaves when `LOG_LEVEL` is misspelled.
pub fn parse_level(name: &str) -> Level {
    match name.trim().parse::<Level>() {
        Ok(level) => level,
        Err(_) => {
            warn!("Unknown log level '{}', using INFO", name);
            Level::INFO
        }
    }
}
