//! Per-user fan-out of live events
//!
//! Every open stream owns one bounded channel registered under its user.
//! Publishing never waits: a subscriber whose channel is full misses that
//! event, and nothing is kept for users without an open stream.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Name of an event on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Notification,
    StatusChange,
    Ping,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Notification => "notification",
            EventType::StatusChange => "status_change",
            EventType::Ping => "ping",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerEvent {
    pub event_type: EventType,
    pub payload: Value,
}

impl BrokerEvent {
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn ping() -> Self {
        Self::new(EventType::Ping, Value::Null)
    }

    /// The `data` field of the frame. Ping frames carry no data.
    pub fn data(&self) -> String {
        match self.event_type {
            EventType::Ping => String::new(),
            _ => self.payload.to_string(),
        }
    }
}

type Registry = HashMap<String, HashMap<u64, mpsc::Sender<BrokerEvent>>>;

/// Registry of open subscriber channels, keyed by user id.
#[derive(Debug)]
pub struct EventBroker {
    capacity: usize,
    next_id: AtomicU64,
    closed: AtomicBool,
    subscribers: Mutex<Registry>,
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// Events buffered per subscriber before new ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

impl EventBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Open a new channel for `user_id`.
    ///
    /// The channel is released when the returned [`Subscription`] is dropped.
    /// After [`close`](Self::close) the subscription is already finished.
    pub fn subscribe(self: &Arc<Self>, user_id: &str) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut registry = self.lock();
        // checked under the lock so a concurrent close() cannot miss this channel
        if !self.closed.load(Ordering::Acquire) {
            let channels = registry.entry(user_id.to_string()).or_default();
            channels.insert(id, sender);
            info!(user_id = %user_id, count = channels.len(), "Stream subscribed");
        }
        drop(registry);

        Subscription {
            id,
            user_id: user_id.to_string(),
            receiver,
            _guard: SubscriptionGuard {
                broker: Arc::clone(self),
                user_id: user_id.to_string(),
                id,
            },
        }
    }

    /// Remove a channel. The user entry goes away with its last channel.
    ///
    /// # Returns
    ///
    /// `false` if the channel was already gone
    pub fn unsubscribe(&self, user_id: &str, subscription_id: u64) -> bool {
        let mut registry = self.lock();
        let Some(channels) = registry.get_mut(user_id) else {
            return false;
        };
        let removed = channels.remove(&subscription_id).is_some();
        let remaining = channels.len();
        if remaining == 0 {
            registry.remove(user_id);
        }
        if removed {
            info!(user_id = %user_id, count = remaining, "Stream unsubscribed");
        }
        removed
    }

    /// Deliver an event to every open channel of `user_id`.
    ///
    /// # Returns
    ///
    /// The number of channels that accepted the event
    pub fn publish(&self, user_id: &str, event_type: EventType, payload: Value) -> usize {
        let event = BrokerEvent::new(event_type, payload);
        let mut registry = self.lock();
        let Some(channels) = registry.get_mut(user_id) else {
            debug!(user_id = %user_id, event = %event_type, "No open streams, event dropped");
            return 0;
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sender) in channels.iter() {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(user_id = %user_id, subscription = id, event = %event_type, "Stream channel full, event dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }
        for id in closed {
            channels.remove(&id);
        }
        if channels.is_empty() {
            registry.remove(user_id);
        }
        delivered
    }

    /// Finish every open stream and refuse new ones.
    pub fn close(&self) {
        let mut registry = self.lock();
        self.closed.store(true, Ordering::Release);
        let dropped: usize = registry.drain().map(|(_, channels)| channels.len()).sum();
        drop(registry);
        info!(streams = dropped, "Event broker closed");
    }

    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.lock().get(user_id).map_or(0, HashMap::len)
    }

    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One open channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    user_id: String,
    receiver: mpsc::Receiver<BrokerEvent>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The next event, or `None` once the broker has closed this channel.
    pub async fn recv(&mut self) -> Option<BrokerEvent> {
        self.receiver.recv().await
    }
}

/// Unsubscribes its channel when dropped, on every exit path.
#[derive(Debug)]
pub struct SubscriptionGuard {
    broker: Arc<EventBroker>,
    user_id: String,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broker.unsubscribe(&self.user_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_no_op() {
        let broker = Arc::new(EventBroker::new(8));
        assert_eq!(broker.publish("nobody", EventType::Notification, json!({"id": "n1"})), 0);
        assert_eq!(broker.user_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_every_event_in_order() {
        let broker = Arc::new(EventBroker::new(8));
        let mut first = broker.subscribe("alice");
        let mut second = broker.subscribe("alice");
        let mut other = broker.subscribe("bob");

        for n in 0..3 {
            assert_eq!(broker.publish("alice", EventType::Notification, json!({ "n": n })), 2);
        }

        for sub in [&mut first, &mut second] {
            for n in 0..3 {
                let event = sub.recv().await.unwrap();
                assert_eq!(event.event_type, EventType::Notification);
                assert_eq!(event.payload, json!({ "n": n }));
            }
        }
        assert!(other.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_twice_is_harmless() {
        let broker = Arc::new(EventBroker::new(8));
        let sub = broker.subscribe("alice");
        assert!(broker.unsubscribe("alice", sub.id()));
        assert!(!broker.unsubscribe("alice", sub.id()));
        assert_eq!(broker.user_count(), 0);
        drop(sub);
        assert_eq!(broker.user_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_subscription_prunes_user() {
        let broker = Arc::new(EventBroker::new(8));
        let first = broker.subscribe("alice");
        let second = broker.subscribe("alice");
        assert_eq!(broker.subscriber_count("alice"), 2);

        drop(first);
        assert_eq!(broker.subscriber_count("alice"), 1);
        drop(second);
        assert_eq!(broker.subscriber_count("alice"), 0);
        assert_eq!(broker.user_count(), 0);
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let broker = Arc::new(EventBroker::new(2));
        let mut slow = broker.subscribe("alice");
        let mut fast = broker.subscribe("alice");

        assert_eq!(broker.publish("alice", EventType::Notification, json!(1)), 2);
        assert_eq!(broker.publish("alice", EventType::Notification, json!(2)), 2);
        fast.recv().await.unwrap();
        fast.recv().await.unwrap();
        assert_eq!(broker.publish("alice", EventType::Notification, json!(3)), 1);

        assert_eq!(fast.recv().await.unwrap().payload, json!(3));
        assert_eq!(slow.recv().await.unwrap().payload, json!(1));
        assert_eq!(slow.recv().await.unwrap().payload, json!(2));
        assert!(slow.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_finishes_open_and_new_subscriptions() {
        let broker = Arc::new(EventBroker::new(8));
        let mut open = broker.subscribe("alice");
        broker.close();
        assert!(open.recv().await.is_none());

        let mut late = broker.subscribe("alice");
        assert!(late.recv().await.is_none());
        assert_eq!(broker.publish("alice", EventType::Ping, Value::Null), 0);
    }

    #[test]
    fn test_close_racing_subscribe_leaves_nothing_registered() {
        for _ in 0..50 {
            let broker = Arc::new(EventBroker::new(8));
            let held = std::thread::scope(|scope| {
                let subscriber = scope.spawn(|| {
                    (0..200)
                        .map(|n| broker.subscribe(&format!("user-{}", n % 4)))
                        .collect::<Vec<_>>()
                });
                broker.close();
                subscriber.join().unwrap()
            });
            assert_eq!(held.len(), 200);
            assert_eq!(broker.user_count(), 0);
        }
    }

    #[test]
    fn test_event_data() {
        let event = BrokerEvent::new(EventType::StatusChange, json!({"id": "n1", "status": "read"}));
        assert_eq!(event.data(), r#"{"id":"n1","status":"read"}"#);
        assert_eq!(BrokerEvent::ping().data(), "");
        assert_eq!(EventType::StatusChange.to_string(), "status_change");
    }
}
