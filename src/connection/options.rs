//! Connection options.
//!
//! Every recognised option with its default, validated once when the
//! connection is created.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use resilient_signaling::ConnectionOptions;
//!
//! let options = ConnectionOptions::new()
//!     .with_welcome_timeout(Duration::from_secs(2))
//!     .with_max_consecutive_failed_hellos(5)
//!     .with_hello_body(serde_json::json!({ "token": "..." }));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::observer::{EventObserver, TracingObserver};
use crate::transport::{TransportFactory, WebSocketFactory};

// ============================================================================
// Constants
// ============================================================================

/// Default heartbeat interval requested in `hello`.
pub const DEFAULT_REQUESTED_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default time to wait for `welcome` after each `hello`.
pub const DEFAULT_WELCOME_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default time to wait for the transport to open.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_millis(15000);

/// Default number of hellos sent before giving up.
pub const DEFAULT_MAX_CONSECUTIVE_FAILED_HELLOS: u32 = 3;

/// Default number of silent heartbeat intervals tolerated.
pub const DEFAULT_MAX_CONSECUTIVE_MISSED_HEARTBEATS: u32 = 3;

// ============================================================================
// ConnectionOptions
// ============================================================================

/// Configuration for a [`Connection`](crate::Connection).
#[derive(Clone)]
pub struct ConnectionOptions {
    /// Heartbeat interval requested from the peer.
    pub requested_heartbeat_timeout: Duration,

    /// Time to wait for `welcome` after each `hello`.
    pub welcome_timeout: Duration,

    /// Time to wait for a transport to open.
    pub open_timeout: Duration,

    /// Hellos sent without a `welcome` before closing with 3000.
    pub max_consecutive_failed_hellos: u32,

    /// Silent heartbeat intervals tolerated before closing with 3001.
    pub max_consecutive_missed_heartbeats: u32,

    /// Optional payload attached to every `hello`.
    pub hello_body: Option<Value>,

    /// Creates a transport per handshake cycle.
    pub transport_factory: Arc<dyn TransportFactory>,

    /// Notified of every state transition.
    pub event_observer: Arc<dyn EventObserver>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("requested_heartbeat_timeout", &self.requested_heartbeat_timeout)
            .field("welcome_timeout", &self.welcome_timeout)
            .field("open_timeout", &self.open_timeout)
            .field("max_consecutive_failed_hellos", &self.max_consecutive_failed_hellos)
            .field(
                "max_consecutive_missed_heartbeats",
                &self.max_consecutive_missed_heartbeats,
            )
            .field("hello_body", &self.hello_body)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ConnectionOptions {
    /// Creates options with every default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requested_heartbeat_timeout: DEFAULT_REQUESTED_HEARTBEAT_TIMEOUT,
            welcome_timeout: DEFAULT_WELCOME_TIMEOUT,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            max_consecutive_failed_hellos: DEFAULT_MAX_CONSECUTIVE_FAILED_HELLOS,
            max_consecutive_missed_heartbeats: DEFAULT_MAX_CONSECUTIVE_MISSED_HEARTBEATS,
            hello_body: None,
            transport_factory: Arc::new(WebSocketFactory),
            event_observer: Arc::new(TracingObserver),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ConnectionOptions {
    /// Sets the heartbeat interval requested in `hello`.
    #[inline]
    #[must_use]
    pub fn with_requested_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.requested_heartbeat_timeout = timeout;
        self
    }

    /// Sets the time to wait for `welcome` after each `hello`.
    #[inline]
    #[must_use]
    pub fn with_welcome_timeout(mut self, timeout: Duration) -> Self {
        self.welcome_timeout = timeout;
        self
    }

    /// Sets the time to wait for a transport to open.
    #[inline]
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the hello retry budget.
    #[inline]
    #[must_use]
    pub fn with_max_consecutive_failed_hellos(mut self, max: u32) -> Self {
        self.max_consecutive_failed_hellos = max;
        self
    }

    /// Sets the number of silent heartbeat intervals tolerated.
    #[inline]
    #[must_use]
    pub fn with_max_consecutive_missed_heartbeats(mut self, max: u32) -> Self {
        self.max_consecutive_missed_heartbeats = max;
        self
    }

    /// Attaches a payload to every `hello`.
    #[inline]
    #[must_use]
    pub fn with_hello_body(mut self, body: Value) -> Self {
        self.hello_body = Some(body);
        self
    }

    /// Replaces the transport factory.
    #[inline]
    #[must_use]
    pub fn with_transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.transport_factory = factory;
        self
    }

    /// Replaces the event observer.
    #[inline]
    #[must_use]
    pub fn with_event_observer(mut self, observer: Arc<dyn EventObserver>) -> Self {
        self.event_observer = observer;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectionOptions {
    /// Rejects values the connection cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any zero duration or zero budget, or a
    /// heartbeat interval that does not fit the wire format.
    pub fn validate(&self) -> Result<()> {
        Self::require_positive("requested_heartbeat_timeout", self.requested_heartbeat_timeout)?;
        Self::require_positive("welcome_timeout", self.welcome_timeout)?;
        Self::require_positive("open_timeout", self.open_timeout)?;

        if u64::try_from(self.requested_heartbeat_timeout.as_millis()).is_err() {
            return Err(Error::config(
                "requested_heartbeat_timeout does not fit in milliseconds",
            ));
        }

        if self.max_consecutive_failed_hellos == 0 {
            return Err(Error::config(
                "max_consecutive_failed_hellos must be at least 1",
            ));
        }

        if self.max_consecutive_missed_heartbeats == 0 {
            return Err(Error::config(
                "max_consecutive_missed_heartbeats must be at least 1",
            ));
        }

        Ok(())
    }

    fn require_positive(name: &str, value: Duration) -> Result<()> {
        if value.is_zero() {
            return Err(Error::config(format!("{name} must be greater than zero")));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = ConnectionOptions::default();
        assert_eq!(options.requested_heartbeat_timeout, Duration::from_secs(5));
        assert_eq!(options.welcome_timeout, Duration::from_secs(5));
        assert_eq!(options.open_timeout, Duration::from_secs(15));
        assert_eq!(options.max_consecutive_failed_hellos, 3);
        assert_eq!(options.max_consecutive_missed_heartbeats, 3);
        assert!(options.hello_body.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let options = ConnectionOptions::new()
            .with_welcome_timeout(Duration::from_millis(250))
            .with_max_consecutive_failed_hellos(5)
            .with_hello_body(json!({ "token": "t" }));

        assert_eq!(options.welcome_timeout, Duration::from_millis(250));
        assert_eq!(options.max_consecutive_failed_hellos, 5);
        assert_eq!(options.hello_body, Some(json!({ "token": "t" })));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let err = ConnectionOptions::new()
            .with_welcome_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: welcome_timeout must be greater than zero"
        );
    }

    #[test]
    fn test_zero_budgets_rejected() {
        assert!(
            ConnectionOptions::new()
                .with_max_consecutive_failed_hellos(0)
                .validate()
                .is_err()
        );
        assert!(
            ConnectionOptions::new()
                .with_max_consecutive_missed_heartbeats(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_debug_skips_trait_objects() {
        let debug = format!("{:?}", ConnectionOptions::new());
        assert!(debug.contains("welcome_timeout"));
        assert!(!debug.contains("transport_factory"));
    }
}
