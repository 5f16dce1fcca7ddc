//! Telemetry event observer.
//!
//! An [`EventObserver`] is notified of the initial state of a connection and
//! of every state transition afterwards. It is a narrow seam for telemetry
//! pipelines; the connection never depends on what the observer does.
//!
//! # Format
//!
//! ```json
//! { "name": "closed", "group": "signaling", "level": "error", "payload": { "reason": "timeout" } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::connection::ConnectionState;
use crate::identifiers::ConnectionId;
use crate::protocol::CloseReason;

// ============================================================================
// Constants
// ============================================================================

/// Group every signaling event belongs to.
pub const SIGNALING_GROUP: &str = "signaling";

// ============================================================================
// EventLevel
// ============================================================================

/// Severity attached to an observer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Normal lifecycle progress.
    Info,
    /// Degraded but recoverable.
    Warning,
    /// Abnormal termination.
    Error,
}

// ============================================================================
// ObserverEvent
// ============================================================================

/// A state notification delivered to an [`EventObserver`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObserverEvent {
    /// Name of the state just entered.
    pub name: &'static str,

    /// Event group, always [`SIGNALING_GROUP`].
    pub group: &'static str,

    /// Severity.
    pub level: EventLevel,

    /// Extra data (`{"reason": ...}` for `closed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Connection the event belongs to.
    #[serde(rename = "connectionId")]
    pub connection_id: ConnectionId,
}

impl ObserverEvent {
    /// Builds the event for entering `state`.
    #[must_use]
    pub fn state(connection_id: ConnectionId, state: ConnectionState) -> Self {
        let level = match state {
            ConnectionState::Wait => EventLevel::Warning,
            _ => EventLevel::Info,
        };

        Self {
            name: state.as_str(),
            group: SIGNALING_GROUP,
            level,
            payload: None,
            connection_id,
        }
    }

    /// Builds the event for entering `closed` with the given reason.
    #[must_use]
    pub fn closed(connection_id: ConnectionId, reason: CloseReason) -> Self {
        let level = if reason == CloseReason::Local {
            EventLevel::Info
        } else {
            EventLevel::Error
        };

        Self {
            name: ConnectionState::Closed.as_str(),
            group: SIGNALING_GROUP,
            level,
            payload: Some(json!({ "reason": reason })),
            connection_id,
        }
    }
}

// ============================================================================
// EventObserver
// ============================================================================

/// Sink for connection state notifications.
pub trait EventObserver: Send + Sync {
    /// Called once per state entered.
    fn emit(&self, event: ObserverEvent);
}

impl<F> EventObserver for F
where
    F: Fn(ObserverEvent) + Send + Sync,
{
    fn emit(&self, event: ObserverEvent) {
        self(event);
    }
}

// ============================================================================
// Built-in Observers
// ============================================================================

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EventObserver for NoopObserver {
    fn emit(&self, _event: ObserverEvent) {}
}

/// Observer that records events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn emit(&self, event: ObserverEvent) {
        match event.level {
            EventLevel::Info => info!(
                connection_id = %event.connection_id,
                group = event.group,
                name = event.name,
                payload = ?event.payload,
                "Signaling event"
            ),
            EventLevel::Warning | EventLevel::Error => warn!(
                connection_id = %event.connection_id,
                group = event.group,
                name = event.name,
                level = ?event.level,
                payload = ?event.payload,
                "Signaling event"
            ),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;

    #[test]
    fn test_wait_is_warning() {
        let event = ObserverEvent::state(ConnectionId::generate(), ConnectionState::Wait);
        assert_eq!(event.name, "wait");
        assert_eq!(event.level, EventLevel::Warning);
        assert!(event.payload.is_none());
    }

    #[test]
    fn test_closed_levels() {
        let id = ConnectionId::generate();
        let local = ObserverEvent::closed(id, CloseReason::Local);
        let remote = ObserverEvent::closed(id, CloseReason::Timeout);

        assert_eq!(local.level, EventLevel::Info);
        assert_eq!(remote.level, EventLevel::Error);
        assert_eq!(remote.payload, Some(json!({ "reason": "timeout" })));
    }

    #[test]
    fn test_serialized_shape() {
        let event = ObserverEvent::state(ConnectionId::generate(), ConnectionState::Open);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["name"], "open");
        assert_eq!(value["group"], "signaling");
        assert_eq!(value["level"], "info");
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn test_closure_observer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = move |event: ObserverEvent| sink.lock().push(event.name);

        observer.emit(ObserverEvent::state(ConnectionId::generate(), ConnectionState::Early));
        assert_eq!(*seen.lock(), vec!["early"]);
    }
}
