//! Handshake retry controller.
//!
//! Builds `hello` envelopes and tracks the hello budget and the session
//! resumption cookie. A `welcome` refills the budget; a `busy` does not, so
//! a peer that keeps answering `busy` cannot keep the handshake alive forever.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;

use crate::identifiers::HelloId;
use crate::protocol::{Hello, PROTOCOL_VERSION};

// ============================================================================
// Handshake
// ============================================================================

/// Hello budget, hello id and cookie for one connection.
#[derive(Debug, Clone)]
pub struct Handshake {
    requested_timeout_ms: u64,
    body: Option<Value>,
    max_hellos: u32,
    hellos_left: u32,
    hello_id: Option<HelloId>,
    cookie: Option<String>,
}

impl Handshake {
    /// Creates a controller with a full budget and no cookie.
    #[must_use]
    pub fn new(requested_timeout: Duration, body: Option<Value>, max_hellos: u32) -> Self {
        Self {
            requested_timeout_ms: u64::try_from(requested_timeout.as_millis()).unwrap_or(u64::MAX),
            body,
            max_hellos,
            hellos_left: max_hellos,
            hello_id: None,
            cookie: None,
        }
    }

    /// Returns `true` if no hello may be sent until the next `welcome`.
    #[inline]
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.hellos_left == 0
    }

    /// Returns the number of hellos sent since the last `welcome`.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.max_hellos - self.hellos_left
    }

    /// Returns the cookie attached to outgoing hellos.
    #[inline]
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Starts a new handshake cycle with a fresh hello id.
    pub fn begin_cycle(&mut self) {
        self.hello_id = Some(HelloId::generate());
    }

    /// Consumes one unit of budget and builds the next `hello`.
    ///
    /// Returns `None` once the budget is spent. Retries within a cycle
    /// reuse the cycle's hello id.
    pub fn next_hello(&mut self) -> Option<Hello> {
        if self.is_exhausted() {
            return None;
        }
        self.hellos_left -= 1;

        let id = *self.hello_id.get_or_insert_with(HelloId::generate);

        Some(Hello {
            id,
            timeout: self.requested_timeout_ms,
            version: PROTOCOL_VERSION,
            cookie: self.cookie.clone(),
            body: self.body.clone(),
        })
    }

    /// Adopts a cookie from `busy`; an absent cookie keeps the current one.
    pub fn adopt_cookie(&mut self, cookie: Option<String>) {
        if let Some(cookie) = cookie {
            self.cookie = Some(cookie);
        }
    }

    /// Refills the budget after a `welcome`.
    pub fn complete(&mut self) {
        self.hellos_left = self.max_hellos;
    }

    /// Forgets the cookie and hello id when the connection closes.
    pub fn reset(&mut self) {
        self.cookie = None;
        self.hello_id = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn handshake(max: u32) -> Handshake {
        Handshake::new(Duration::from_millis(5000), None, max)
    }

    #[test]
    fn test_budget_is_bounded() {
        let mut handshake = handshake(3);
        handshake.begin_cycle();

        assert!(handshake.next_hello().is_some());
        assert!(handshake.next_hello().is_some());
        assert!(handshake.next_hello().is_some());
        assert!(handshake.is_exhausted());
        assert_eq!(handshake.attempts(), 3);
        assert!(handshake.next_hello().is_none());
    }

    #[test]
    fn test_complete_refills_budget() {
        let mut handshake = handshake(1);
        handshake.next_hello();
        assert!(handshake.is_exhausted());

        handshake.complete();

        assert!(!handshake.is_exhausted());
        assert_eq!(handshake.attempts(), 0);
    }

    #[test]
    fn test_retries_reuse_id_until_new_cycle() {
        let mut handshake = handshake(3);
        handshake.begin_cycle();
        let first = handshake.next_hello().unwrap();
        let retry = handshake.next_hello().unwrap();
        assert_eq!(first.id, retry.id);

        handshake.begin_cycle();
        let next_cycle = handshake.next_hello().unwrap();
        assert_ne!(first.id, next_cycle.id);
    }

    #[test]
    fn test_hello_fields() {
        let mut handshake =
            Handshake::new(Duration::from_millis(1234), Some(json!({ "a": 1 })), 2);
        let hello = handshake.next_hello().unwrap();

        assert_eq!(hello.timeout, 1234);
        assert_eq!(hello.version, 2);
        assert_eq!(hello.cookie, None);
        assert_eq!(hello.body, Some(json!({ "a": 1 })));
    }

    #[test]
    fn test_cookie_overwritten_but_never_cleared_by_busy() {
        let mut handshake = handshake(5);
        handshake.adopt_cookie(Some("first".into()));
        handshake.adopt_cookie(None);
        assert_eq!(handshake.cookie(), Some("first"));

        handshake.adopt_cookie(Some("second".into()));
        assert_eq!(handshake.next_hello().unwrap().cookie.as_deref(), Some("second"));

        handshake.reset();
        assert_eq!(handshake.cookie(), None);
    }
}
