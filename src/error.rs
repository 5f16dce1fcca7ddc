//! Error types for the signaling channel.
//!
//! Two kinds of failure exist:
//!
//! - [`Error`]: returned from fallible API calls and carried by
//!   non-fatal [`ConnectionEvent::Error`](crate::ConnectionEvent::Error) events.
//! - [`CloseError`]: the classified, terminal cause carried by
//!   [`ConnectionEvent::Close`](crate::ConnectionEvent::Close).
//!
//! # Usage
//!
//! ```ignore
//! use resilient_signaling::{Connection, ConnectionOptions, Result};
//!
//! async fn example() -> Result<()> {
//!     let (connection, mut events) =
//!         Connection::new("wss://signaling.example.com", ConnectionOptions::default())?;
//!     connection.send(&serde_json::json!({ "join": "room" }))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Url`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownMessageType`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::protocol::{CloseCode, CloseReason};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid connection options.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The server URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The transport could not be created or used.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The transport or the connection task is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The peer reported a problem with a message (`bad` envelope).
    #[error("Protocol error: {message}")]
    Protocol {
        /// Reason given by the peer.
        message: String,
    },

    /// An envelope carried a `type` this client does not understand.
    #[error("Unknown message type: {message_type}")]
    UnknownMessageType {
        /// The unrecognized type tag.
        message_type: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown message type error.
    #[inline]
    pub fn unknown_message_type(message_type: impl Into<String>) -> Self {
        Self::UnknownMessageType {
            message_type: message_type.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::ConnectionClosed)
    }

    /// Returns `true` if the error came from an inbound envelope.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::UnknownMessageType { .. } | Self::Json(_)
        )
    }
}

// ============================================================================
// CloseError
// ============================================================================

/// Terminal cause of a connection closure.
///
/// A caller-initiated close is reported as `None` rather than as a
/// [`CloseError`] with [`CloseCode::Normal`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("WebSocket Error {code}: {reason}")]
pub struct CloseError {
    /// Classified close code.
    pub code: CloseCode,
    /// Human readable reason.
    pub reason: String,
}

impl CloseError {
    /// Creates a close error.
    #[inline]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Returns the numeric close code.
    #[inline]
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code.as_u16()
    }

    /// Returns the coarse close reason.
    #[inline]
    #[must_use]
    pub const fn close_reason(&self) -> CloseReason {
        self.code.close_reason()
    }

    /// Returns `true` if a timer expiry caused the closure.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.close_reason() == CloseReason::Timeout
    }
}

// ============================================================================
// Tests
// ============================================================================
