//! Connection states.
//!
//! ```text
//!        ------------------------------------------
//!        |                                        |
//!        |                                        v
//!   +---------+       +--------------+       +----------+
//!   |  early  | ----> |  connecting  | ----> |  closed  |
//!   +---------+       +--------------+       +----------+
//!     ^                     | ^ |                 ^ ^
//!     | --------------------- | |                 | |
//!     | | --------------------- |                 | |
//!     | | | --------------------|------------------ |
//!     | v | |                   v                   |
//!   +----------+           +--------+               |
//!   |   wait   |           |  open  | ---------------
//!   +----------+           +--------+
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Waiting for the transport to open.
    Early,
    /// `hello` sent, waiting for `welcome`.
    Connecting,
    /// Handshake complete.
    Open,
    /// Backing off after a `busy`.
    Wait,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns the state name used in events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Wait => "wait",
            Self::Closed => "closed",
        }
    }

    /// Returns `true` for the terminal state.
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the handshake has completed.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if `next` may follow this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Early, Self::Connecting | Self::Closed)
                | (Self::Connecting, Self::Open | Self::Wait | Self::Closed)
                | (Self::Open, Self::Closed)
                | (Self::Wait, Self::Connecting | Self::Early | Self::Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use ConnectionState::*;

    const ALL: [ConnectionState; 5] = [Early, Connecting, Open, Wait, Closed];

    #[test]
    fn test_closed_is_terminal() {
        for next in ALL {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_every_live_state_can_close() {
        for state in [Early, Connecting, Open, Wait] {
            assert!(state.can_transition_to(Closed), "{state} -> closed");
        }
    }

    #[test]
    fn test_open_only_reachable_from_connecting() {
        for state in ALL {
            assert_eq!(state.can_transition_to(Open), state == Connecting);
        }
    }

    #[test]
    fn test_wait_paths() {
        assert!(Connecting.can_transition_to(Wait));
        assert!(Wait.can_transition_to(Connecting));
        assert!(Wait.can_transition_to(Early));
        assert!(!Open.can_transition_to(Wait));
    }

    #[test]
    fn test_names() {
        assert_eq!(Wait.to_string(), "wait");
        assert_eq!(serde_json::to_value(Connecting).unwrap(), "connecting");
    }
}
