//! Signed session cookies
//!
//! A session value has the shape `payload.issued.signature`, every part
//! URL-safe base64 without padding. The payload is the JSON object
//! `{"uid": "<user id>"}`, `issued` is the big-endian UNIX timestamp of
//! creation, and the signature is HMAC-SHA256 over `payload.issued`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a session value was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session secret must not be empty")]
    InvalidKey,

    #[error("Malformed session value")]
    Malformed,

    #[error("Bad session signature")]
    BadSignature,

    #[error("Session expired")]
    Expired,

    #[error("Session lifetime of {0} seconds is out of range")]
    InvalidMaxAge(u64),
}

#[derive(Deserialize)]
struct SessionPayload {
    uid: String,
}

/// Creates and validates signed session values.
#[derive(Clone)]
pub struct SessionCodec {
    mac: HmacSha256,
    max_age: Duration,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Create a codec keyed with `secret` whose sessions live `max_age_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidKey`] for an empty secret and
    /// [`SessionError::InvalidMaxAge`] for a lifetime chrono cannot represent.
    pub fn new(secret: &str, max_age_secs: u64) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::InvalidKey);
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SessionError::InvalidKey)?;
        let max_age = i64::try_from(max_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or(SessionError::InvalidMaxAge(max_age_secs))?;
        Ok(Self { mac, max_age })
    }

    /// Session lifetime in seconds, used for the cookie `Max-Age`.
    pub fn max_age_secs(&self) -> i64 {
        self.max_age.num_seconds()
    }

    /// Sign a new session for `user_id`.
    pub fn create_session(&self, user_id: &str) -> String {
        self.sign_at(user_id, Utc::now())
    }

    /// Check a session value and return the user id it carries.
    pub fn validate_session(&self, value: &str) -> Result<String, SessionError> {
        self.validate_at(value, Utc::now())
    }

    pub fn sign_at(&self, user_id: &str, issued_at: DateTime<Utc>) -> String {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "uid": user_id }).to_string());
        let issued = URL_SAFE_NO_PAD.encode(issued_at.timestamp().to_be_bytes());
        let signing_input = format!("{}.{}", payload, issued);

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }

    pub fn validate_at(&self, value: &str, now: DateTime<Utc>) -> Result<String, SessionError> {
        let mut parts = value.split('.');
        let (payload, issued, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(i), Some(s), None) if !p.is_empty() && !i.is_empty() => (p, i, s),
            _ => return Err(SessionError::Malformed),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::BadSignature)?;
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.update(b".");
        mac.update(issued.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let issued: [u8; 8] = URL_SAFE_NO_PAD
            .decode(issued)
            .map_err(|_| SessionError::Malformed)?
            .try_into()
            .map_err(|_| SessionError::Malformed)?;
        let age = now.timestamp() - i64::from_be_bytes(issued);
        if age < 0 || age > self.max_age.num_seconds() {
            return Err(SessionError::Expired);
        }

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let payload: SessionPayload =
            serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;
        if payload.uid.is_empty() {
            return Err(SessionError::Malformed);
        }
        Ok(payload.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new("unit-test-secret", 3600).unwrap()
    }

    #[test]
    fn test_roundtrip_returns_user_id() {
        let codec = codec();
        let value = codec.create_session("user-42");
        assert_eq!(value.split('.').count(), 3);
        assert_eq!(codec.validate_session(&value).unwrap(), "user-42");
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let codec = codec();
        let issued = Utc::now() - Duration::seconds(3601);
        let value = codec.sign_at("user-42", issued);
        assert_eq!(codec.validate_session(&value), Err(SessionError::Expired));

        let still_valid = codec.sign_at("user-42", Utc::now() - Duration::seconds(3500));
        assert!(codec.validate_session(&still_valid).is_ok());
    }

    #[test]
    fn test_future_issued_session_is_rejected() {
        let codec = codec();
        let now = Utc::now();
        let value = codec.sign_at("user-42", now + Duration::seconds(120));
        assert_eq!(codec.validate_at(&value, now), Err(SessionError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let value = codec().create_session("user-42");
        let other = SessionCodec::new("another-secret", 3600).unwrap();
        assert_eq!(other.validate_session(&value), Err(SessionError::BadSignature));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = codec();
        let value = codec.create_session("user-42");
        let mut parts: Vec<&str> = value.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(r#"{"uid":"admin"}"#);
        parts[0] = &forged;
        assert_eq!(
            codec.validate_session(&parts.join(".")),
            Err(SessionError::BadSignature)
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        let codec = codec();
        for value in ["", "abc", "a.b", "a.b.c.d", "..", "not base64!.x.y"] {
            assert!(codec.validate_session(value).is_err(), "accepted {:?}", value);
        }
    }

    #[test]
    fn test_empty_secret_is_refused() {
        assert_eq!(SessionCodec::new("", 60).unwrap_err(), SessionError::InvalidKey);
    }

    #[test]
    fn test_out_of_range_lifetime_is_refused() {
        let too_long = (i64::MAX / 1000 + 1) as u64;
        assert_eq!(
            SessionCodec::new("k", too_long).unwrap_err(),
            SessionError::InvalidMaxAge(too_long)
        );
        assert!(SessionCodec::new("k", u64::MAX).is_err());
        let codec = SessionCodec::new("k", 604800).unwrap();
        assert_eq!(codec.max_age_secs(), 604800);
    }
}
