// --- File: crates/priority_notify_config/src/lib.rs ---
use config::{Config, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;
use tracing::debug;

pub mod env_vars;
pub mod models;

use env_vars::{flat_overrides, get_config_prefix, inject_env_vars, FlatValue, CONFIG_SEPARATOR};
pub use config::ConfigError;
pub use models::*;

/// Load the application configuration.
///
/// Sources, later ones winning:
/// 1. `{CONFIG_DIR}/default.*` (optional, `CONFIG_DIR` defaults to `config`)
/// 2. `{CONFIG_DIR}/{RUN_ENV}.*` (optional, `RUN_ENV` defaults to `debug`)
/// 3. `PRIORITY_NOTIFY__SECTION__KEY` environment variables
/// 4. flat names such as `DATABASE_URL` or `SECRET_KEY`
///
/// Afterwards every `"secret_from_env"` marker is resolved from the secret env vars.
///
/// # Errors
///
/// Returns a `ConfigError` when a source cannot be parsed or the merged
/// result does not fit `AppConfig`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = get_config_prefix();
    let config_dir = PathBuf::from(env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string()));

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);
    debug!(
        "loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let mut builder = Config::builder()
        .add_source(File::from(default_path).required(false))
        .add_source(File::from(env_path).required(false))
        .add_source(
            Environment::with_prefix(&prefix)
                .separator(CONFIG_SEPARATOR)
                .try_parsing(true),
        );

    for (path, value) in flat_overrides(|name| env::var(name).ok()) {
        builder = match value {
            FlatValue::Text(text) => builder.set_override(path, text)?,
            FlatValue::List(items) => builder.set_override(path, items)?,
        };
    }

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Replaces `"secret_from_env"` markers in the config with their environment values.
///
/// # Errors
///
/// Fails if the config cannot round-trip through JSON.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json =
        serde_json::to_value(&config).map_err(|e| ConfigError::Message(e.to_string()))?;
    if !inject_env_vars(&mut json) {
        return Ok(config);
    }
    serde_json::from_value(json).map_err(|e| ConfigError::Message(e.to_string()))
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Ensures that the dotenv file is loaded into the environment variables.
///
/// `DOTENV_OVERRIDE` wins, then a first command line argument starting with `.env`,
/// otherwise `.env`. The file is only read once per process.
///
/// # Returns
///
/// The path that was used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = std::env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}
