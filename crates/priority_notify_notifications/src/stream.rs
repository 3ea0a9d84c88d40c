//! The per-connection event loop behind `/api/notifications/stream`

use async_stream::stream;
use futures_util::Stream;
use std::time::Duration;
use tokio::time::timeout;

use crate::broker::{BrokerEvent, Subscription};

/// Default time without events before a ping is sent.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

/// Drain `subscription`, sending a ping whenever `heartbeat` passes quietly.
///
/// The stream ends when the broker closes the channel. The subscription is
/// released when the stream is dropped, including on client disconnect.
pub fn event_stream(
    mut subscription: Subscription,
    heartbeat: Duration,
) -> impl Stream<Item = BrokerEvent> + Send {
    stream! {
        loop {
            match timeout(heartbeat, subscription.recv()).await {
                Ok(Some(event)) => yield event,
                Ok(None) => break,
                Err(_) => yield BrokerEvent::ping(),
            }
        }
    }
}
