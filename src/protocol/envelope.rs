//! Envelope message types.
//!
//! Every frame exchanged with the signaling server is a JSON object
//! tagged by its `type` field.
//!
//! # Format
//!
//! ```json
//! { "type": "hello", "id": "uuid", "timeout": 5000, "version": 2, "cookie": "..." }
//! { "type": "welcome", "negotiatedTimeout": 5000 }
//! { "type": "busy", "keepAlive": true, "retryAfter": 1000, "cookie": "..." }
//! { "type": "msg", "body": { ... } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::identifiers::HelloId;

// ============================================================================
// Constants
// ============================================================================

/// Protocol version announced in every `hello`.
pub const PROTOCOL_VERSION: u32 = 2;

// ============================================================================
// Envelope
// ============================================================================

/// A protocol-level message.
///
/// Application payloads travel inside [`Envelope::Msg`] and are never
/// interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// Handshake request (outbound).
    Hello(Hello),

    /// Handshake acceptance (inbound).
    Welcome(Welcome),

    /// Liveness signal (both directions).
    Heartbeat,

    /// Application message (both directions).
    Msg {
        /// Opaque application payload.
        #[serde(default)]
        body: Value,
    },

    /// The peer rejected something we sent (inbound).
    Bad {
        /// Reason given by the peer.
        #[serde(default)]
        reason: String,
    },

    /// Server-directed backoff (inbound).
    Busy(Busy),

    /// Graceful goodbye (outbound).
    Bye,
}

impl Envelope {
    /// Wire names of every envelope type.
    pub const TYPES: [&'static str; 7] =
        ["hello", "welcome", "heartbeat", "msg", "bad", "busy", "bye"];

    /// Creates an application message envelope.
    #[inline]
    #[must_use]
    pub fn msg(body: Value) -> Self {
        Self::Msg { body }
    }

    /// Returns the wire name of this envelope's type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Hello(_) => "hello",
            Self::Welcome(_) => "welcome",
            Self::Heartbeat => "heartbeat",
            Self::Msg { .. } => "msg",
            Self::Bad { .. } => "bad",
            Self::Busy(_) => "busy",
            Self::Bye => "bye",
        }
    }
}

// ============================================================================
// Hello
// ============================================================================

/// Handshake request sent once the transport is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hello {
    /// Identifier of the handshake cycle.
    pub id: HelloId,

    /// Requested heartbeat interval in milliseconds.
    pub timeout: u64,

    /// Protocol version.
    pub version: u32,

    /// Session resumption cookie, once issued by the peer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,

    /// Optional caller-supplied payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

// ============================================================================
// Welcome
// ============================================================================

/// Handshake acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    /// Heartbeat interval granted by the peer, in milliseconds.
    #[serde(deserialize_with = "deserialize_millis")]
    pub negotiated_timeout: i64,
}

// ============================================================================
// Busy
// ============================================================================

/// Server-directed backoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Busy {
    /// Keep the transport open while waiting.
    #[serde(default)]
    pub keep_alive: bool,

    /// Milliseconds to wait before retrying; negative means never.
    #[serde(deserialize_with = "deserialize_millis")]
    pub retry_after: i64,

    /// Session resumption cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl Busy {
    /// Returns `true` if the peer refuses any further attempt.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.retry_after < 0
    }
}

// ============================================================================
// Millisecond Fields
// ============================================================================

/// Reads a millisecond count from any JSON number.
///
/// Fractions are truncated toward zero and out-of-range values saturate.
#[allow(clippy::cast_possible_truncation)]
fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;

    if let Some(ms) = number.as_i64() {
        return Ok(ms);
    }
    if number.is_u64() {
        return Ok(i64::MAX);
    }
    number
        .as_f64()
        .filter(|ms| ms.is_finite())
        .map(|ms| ms as i64)
        .ok_or_else(|| D::Error::custom(format!("invalid millisecond count: {number}")))
}

// ============================================================================
// Tests
// ============================================================================
