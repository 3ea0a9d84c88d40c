//! Environment variable handling for priority-notify.
//!
//! Layered settings use `PRIORITY_NOTIFY__SECTION__KEY`. A handful of flat
//! names (`DATABASE_URL`, `SECRET_KEY`, `AUTHENTIK_*`, ...) are also honoured
//! because deployments already export them.

use std::env;

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "PRIORITY_NOTIFY";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "PRIORITY_NOTIFY_SECRET";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Flat environment names and the configuration path each one overrides.
/// The flag marks comma separated lists.
pub const FLAT_ENV_KEYS: &[(&str, &str, bool)] = &[
    ("DATABASE_URL", "database.url", false),
    ("SECRET_KEY", "auth.secret_key", false),
    ("ALLOWED_HOSTS", "server.allowed_hosts", true),
    ("AUTHENTIK_ISSUER_URL", "oidc.issuer_url", false),
    ("AUTHENTIK_CLIENT_ID", "oidc.client_id", false),
    ("AUTHENTIK_CLIENT_SECRET", "oidc.client_secret", false),
    ("AUTHENTIK_REDIRECT_URI", "oidc.redirect_uri", false),
    ("LOG_LEVEL", "log_level", false),
    ("CORS_ORIGINS", "cors_origins", true),
];

/// A value taken from a flat environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatValue {
    Text(String),
    List(Vec<String>),
}

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a secret path to an environment variable name
///
/// # Arguments
///
/// * `path` - The secret path (e.g., "oidc.client_secret")
///
/// # Returns
///
/// The environment variable name (e.g., "PRIORITY_NOTIFY_SECRET_OIDC_CLIENT_SECRET")
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to its unprefixed name (e.g. "AUTH_SECRET_KEY").
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    path.replace('.', SECRET_SEPARATOR).to_uppercase()
}

/// Get an environment variable for a secret path, trying the prefixed name first.
pub fn get_secret_env_var(path: &str) -> Option<String> {
    let env_var = secret_path_to_env_var(path);
    if let Ok(value) = env::var(&env_var) {
        return Some(value);
    }

    let legacy_env_var = legacy_secret_path_to_env_var(path);
    env::var(&legacy_env_var).ok()
}

/// Split a comma separated list, trimming entries and skipping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collect the overrides coming from flat environment names.
///
/// `lookup` abstracts the environment so callers (and tests) can supply their own source.
pub fn flat_overrides<F>(lookup: F) -> Vec<(&'static str, FlatValue)>
where
    F: Fn(&str) -> Option<String>,
{
    FLAT_ENV_KEYS
        .iter()
        .filter_map(|(name, path, is_list)| {
            let raw = lookup(name)?;
            let value = if *is_list {
                FlatValue::List(split_list(&raw))
            } else {
                FlatValue::Text(raw)
            };
            Some((*path, value))
        })
        .collect()
}

/// Replace every `"secret_from_env"` string in a JSON tree with the matching secret env var.
///
/// # Returns
///
/// `true` if any values were replaced, `false` otherwise
pub fn inject_env_vars(value: &mut serde_json::Value) -> bool {
    use serde_json::Value;

    fn walk(path: Vec<String>, obj: &mut Value) -> bool {
        let mut replaced = false;

        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::String(s) if s == "secret_from_env" => {
                let path_str = path.join(".");
                if let Some(env_val) = get_secret_env_var(&path_str) {
                    *s = env_val;
                    replaced = true;
                } else {
                    tracing::warn!("env var for {} not found", path_str);
                }
            }
            _ => {}
        }

        replaced
    }

    walk(vec![], value)
}
