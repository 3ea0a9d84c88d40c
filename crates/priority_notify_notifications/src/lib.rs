//! The notification inbox for priority-notify
//!
//! Devices push notifications with a bearer token, the dashboard lists and
//! updates them with its session, and every open dashboard receives new
//! notifications and status changes as server-sent events.
//!
//! # API Endpoints
//!
//! - `GET /api/notifications` - Page through notifications, newest first
//! - `POST /api/notifications` - Create a notification
//! - `GET /api/notifications/stream` - Live `notification`, `status_change` and `ping` events
//! - `GET /api/notifications/{id}` - Fetch one notification
//! - `PATCH /api/notifications/{id}` - Change its status
//! - `DELETE /api/notifications/{id}` - Delete it

pub mod broker;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod handlers;
pub mod routes;
pub mod stream;

pub use broker::{BrokerEvent, EventBroker, EventType, Subscription, SubscriptionGuard};
pub use handlers::NotificationsState;
pub use routes::routes;
pub use stream::event_stream;

#[cfg(feature = "openapi")]
pub mod openapi {
    pub use crate::doc::NotificationsApiDoc;
}
