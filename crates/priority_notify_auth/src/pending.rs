//! Outstanding login `state` values
//!
//! A state is issued when the browser is sent to the identity provider and
//! may be redeemed once, before it expires.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct PendingStates {
    ttl: Duration,
    states: Mutex<HashMap<String, Instant>>,
}

impl PendingStates {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Create and remember a new random state.
    pub fn issue(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let state = URL_SAFE_NO_PAD.encode(bytes);
        self.insert_at(state.clone(), Instant::now());
        state
    }

    /// Redeem a state. Unknown, already used and expired values all fail.
    pub fn consume(&self, state: &str) -> bool {
        self.take_at(state, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&self, state: String, now: Instant) {
        let mut states = self.lock();
        let ttl = self.ttl;
        states.retain(|_, issued| now.duration_since(*issued) <= ttl);
        states.insert(state, now);
    }

    fn take_at(&self, state: &str, now: Instant) -> bool {
        match self.lock().remove(state) {
            Some(issued) => now.duration_since(issued) <= self.ttl,
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_redeemable_once() {
        let pending = PendingStates::new(Duration::from_secs(60));
        let state = pending.issue();
        assert!(pending.consume(&state));
        assert!(!pending.consume(&state));
        assert!(!pending.consume("never-issued"));
    }

    #[test]
    fn test_expired_state_is_refused_and_pruned() {
        let pending = PendingStates::new(Duration::from_secs(60));
        let start = Instant::now();
        pending.insert_at("old".to_string(), start);
        assert!(!pending.take_at("old", start + Duration::from_secs(61)));

        pending.insert_at("stale".to_string(), start);
        pending.insert_at("fresh".to_string(), start + Duration::from_secs(120));
        assert_eq!(pending.len(), 1);
        assert!(pending.take_at("fresh", start + Duration::from_secs(121)));
    }
}
