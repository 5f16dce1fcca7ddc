//! Events raised to the connection's owner.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;

use crate::connection::ConnectionState;
use crate::error::{CloseError, Error};

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Something the caller should know about.
///
/// Every state change produces [`ConnectionEvent::StateChanged`] first,
/// followed by the event specific to that change, if any.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Handshake completed; queued messages have been flushed.
    Open,

    /// Application payload from a `msg` envelope.
    Message(Value),

    /// Non-fatal problem: malformed or unexpected inbound data, or a `bad`
    /// envelope received while open.
    Error(Error),

    /// Terminal. `None` for a normal close, otherwise the cause.
    Close(Option<CloseError>),

    /// The connection entered a new state.
    StateChanged(ConnectionState),

    /// Backing off after `busy`.
    Wait {
        /// Whether the current transport is kept for the retry.
        keep_alive: bool,
        /// Delay before the next handshake attempt.
        retry_after: Duration,
    },
}

impl ConnectionEvent {
    /// Returns `true` for the terminal event.
    #[inline]
    #[must_use]
    pub const fn is_close(&self) -> bool {
        matches!(self, Self::Close(_))
    }

    /// Returns the new state for [`ConnectionEvent::StateChanged`].
    #[inline]
    #[must_use]
    pub const fn state(&self) -> Option<ConnectionState> {
        match self {
            Self::StateChanged(state) => Some(*state),
            _ => None,
        }
    }
}
