//! Auth-state events and the bus that distributes them
//!
//! Anything that caches session state (the server's session provider) subscribes
//! here and re-fetches when an event names a token it cares about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Auth-state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthEvent {
    /// A new session was opened
    SignedIn {
        user_id: Uuid,
        token: String,
        timestamp: DateTime<Utc>,
    },

    /// A session token was rotated; `old_token` is no longer valid
    TokenRefreshed {
        user_id: Uuid,
        old_token: String,
        new_token: String,
        timestamp: DateTime<Utc>,
    },

    /// A session was closed
    SignedOut {
        user_id: Uuid,
        token: String,
        timestamp: DateTime<Utc>,
    },
}

impl AuthEvent {
    pub fn event_type(&self) -> &str {
        match self {
            AuthEvent::SignedIn { .. } => "SignedIn",
            AuthEvent::TokenRefreshed { .. } => "TokenRefreshed",
            AuthEvent::SignedOut { .. } => "SignedOut",
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            AuthEvent::SignedIn { user_id, .. }
            | AuthEvent::TokenRefreshed { user_id, .. }
            | AuthEvent::SignedOut { user_id, .. } => *user_id,
        }
    }
}

/// Central distribution bus for auth events
///
/// Uses `tokio::broadcast` internally:
/// - publishing never blocks on slow subscribers
/// - dropping a receiver unsubscribes it
/// - slow subscribers observe `Lagged` instead of stalling producers
///
/// # Examples
///
/// ```
/// use ballot_common::events::{AuthEvent, EventBus};
/// use uuid::Uuid;
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(AuthEvent::SignedIn {
///     user_id: Uuid::new_v4(),
///     token: "abc".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "SignedIn");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AuthEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: AuthEvent) -> Result<usize, broadcast::error::SendError<AuthEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
