//! Reading credentials from request headers and writing the session cookie

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use cookie::time::Duration;
use cookie::{Cookie, CookieJar, SameSite};

/// Find the value of cookie `name` in any `Cookie` header.
///
/// Quoted values are unquoted.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let mut jar = CookieJar::new();
    for header in headers.get_all(COOKIE).iter().filter_map(|v| v.to_str().ok()) {
        for pair in header.split(';') {
            if let Ok(cookie) = Cookie::parse_encoded(pair.trim()) {
                jar.add_original(cookie.into_owned());
            }
        }
    }

    let value = jar.get(name)?.value().trim_matches('"').trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn base_cookie(name: &str, value: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// A `Set-Cookie` value carrying a new session.
pub fn session_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = base_cookie(name, value, secure);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie.to_string()
}

/// A `Set-Cookie` value that removes the session.
pub fn clear_session_cookie(name: &str, secure: bool) -> String {
    let mut cookie = base_cookie(name, "", secure);
    cookie.make_removal();
    cookie.to_string()
}
