//! Rejects requests addressed to a host name that is not configured.

use axum::{
    extract::{Request, State},
    http::header::HOST,
    middleware::Next,
    response::{IntoResponse, Response},
};
use priority_notify_common::NotifyError;
use std::sync::Arc;
use tracing::warn;

/// The `server.allowed_hosts` list. Empty allows every host.
///
/// Entries are exact names, `*`, or `*.example.com` for any subdomain.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts {
    hosts: Vec<String>,
}

impl AllowedHosts {
    pub fn new(hosts: &[String]) -> Self {
        Self {
            hosts: hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn permits(&self, host: &str) -> bool {
        if self.hosts.is_empty() {
            return true;
        }
        let name = strip_port(host).to_ascii_lowercase();
        self.hosts.iter().any(|pattern| {
            pattern == "*"
                || *pattern == name
                || pattern
                    .strip_prefix("*.")
                    .is_some_and(|suffix| name.ends_with(&format!(".{}", suffix)))
        })
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return host.split_once(']').map_or(host, |(ip, _)| &host[..=ip.len()]);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Axum middleware enforcing [`AllowedHosts`].
pub async fn allowed_host_guard(
    State(allowed): State<Arc<AllowedHosts>>,
    req: Request,
    next: Next,
) -> Response {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or_default()
        .to_string();

    if allowed.permits(&host) {
        next.run(req).await
    } else {
        warn!(host = %host, "Request for a host that is not allowed");
        NotifyError::BadRequest("Invalid host header".to_string()).into_response()
    }
}
