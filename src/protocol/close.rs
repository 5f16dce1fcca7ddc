//! Close codes and close reasons.
//!
//! Every terminal closure of a connection is classified by a stable
//! WebSocket close code. Codes in the 3000 range are private to the
//! signaling protocol; anything else is forwarded from the transport.
//!
//! | Code | Variant | Reason |
//! |------|---------|--------|
//! | 1000 | [`CloseCode::Normal`] | `local` |
//! | 3000 | [`CloseCode::HandshakeExhausted`] | `timeout` |
//! | 3001 | [`CloseCode::HeartbeatTimeout`] | `timeout` |
//! | 3002 | [`CloseCode::ProtocolViolation`] | `failed` |
//! | 3003 | [`CloseCode::SendFailed`] | `failed` |
//! | 3004 | [`CloseCode::NetworkChanged`] | `timeout` |
//! | 3005 | [`CloseCode::BusyWait`] | (transport only) |
//! | 3006 | [`CloseCode::Rejected`] | `busy` |
//! | 3007 | [`CloseCode::OpenTimeout`] | `timeout` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// CloseCode
// ============================================================================

/// Stable numeric classification of a connection closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// Caller-initiated close.
    Normal,
    /// No `welcome` within the hello retry budget.
    HandshakeExhausted,
    /// Liveness lost after reaching open.
    HeartbeatTimeout,
    /// A `bad` envelope arrived before the session was open.
    ProtocolViolation,
    /// The transport rejected an outgoing message.
    SendFailed,
    /// The host reported a network change.
    NetworkChanged,
    /// Transport closed to honour a non keep-alive `busy`.
    ///
    /// Never terminal for the connection itself.
    BusyWait,
    /// The peer refused reconnection (`busy` with negative `retryAfter`).
    Rejected,
    /// The transport did not open in time.
    OpenTimeout,
    /// Any other code reported by the transport.
    Other(u16),
}

impl CloseCode {
    /// Returns the numeric WebSocket close code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::HandshakeExhausted => 3000,
            Self::HeartbeatTimeout => 3001,
            Self::ProtocolViolation => 3002,
            Self::SendFailed => 3003,
            Self::NetworkChanged => 3004,
            Self::BusyWait => 3005,
            Self::Rejected => 3006,
            Self::OpenTimeout => 3007,
            Self::Other(code) => code,
        }
    }

    /// Maps a numeric close code back to its classification.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            3000 => Self::HandshakeExhausted,
            3001 => Self::HeartbeatTimeout,
            3002 => Self::ProtocolViolation,
            3003 => Self::SendFailed,
            3004 => Self::NetworkChanged,
            3005 => Self::BusyWait,
            3006 => Self::Rejected,
            3007 => Self::OpenTimeout,
            other => Self::Other(other),
        }
    }

    /// Returns the coarse close reason reported to the event observer.
    #[must_use]
    pub const fn close_reason(self) -> CloseReason {
        match self {
            Self::Normal => CloseReason::Local,
            Self::HandshakeExhausted
            | Self::HeartbeatTimeout
            | Self::NetworkChanged
            | Self::OpenTimeout => CloseReason::Timeout,
            Self::ProtocolViolation | Self::SendFailed => CloseReason::Failed,
            Self::Rejected => CloseReason::Busy,
            Self::BusyWait | Self::Other(_) => CloseReason::Remote,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

// ============================================================================
// CloseReason
// ============================================================================

/// Coarse reason a connection was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    /// The peer answered `busy` and refused to retry.
    Busy,
    /// The handshake or a send failed.
    Failed,
    /// The caller closed the connection.
    Local,
    /// The transport was closed by the remote end.
    Remote,
    /// A timer expired.
    Timeout,
}

impl CloseReason {
    /// Returns the wire name of the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Failed => "failed",
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
