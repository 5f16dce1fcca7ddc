//! Transport abstraction.
//!
//! The signaling connection runs over any bidirectional, message-oriented
//! transport. A [`TransportFactory`] creates one [`Transport`] per handshake
//! cycle and hands it a [`TransportSink`] through which the transport
//! reports its lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   send / close    ┌──────────────────┐
//! │ ConnectionMachine│ ────────────────► │    Transport     │
//! │                  │                   │  (WebSocket...)  │
//! │                  │ ◄──────────────── │                  │
//! └──────────────────┘   TransportSink   └──────────────────┘
//!                      open/message/close
//! ```
//!
//! Every sink carries the generation of the transport it belongs to, so
//! notifications from a retired transport are recognised and dropped.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `websocket` | Default tokio-tungstenite adapter |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport adapter.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;

// ============================================================================
// Re-exports
// ============================================================================

pub use websocket::WebSocketFactory;

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when a transport ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle notification emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is connected and can send.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The transport is closed and will not emit anything else.
    Close {
        /// Close code.
        code: u16,
        /// Close reason.
        reason: String,
    },
}

/// A [`TransportEvent`] tagged with the generation of its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportNotice {
    /// Generation of the transport that emitted the event.
    pub generation: u64,
    /// The event itself.
    pub event: TransportEvent,
}

// ============================================================================
// TransportSink
// ============================================================================

/// Handle a transport uses to report its lifecycle.
#[derive(Debug, Clone)]
pub struct TransportSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TransportNotice>,
}

impl TransportSink {
    /// Creates a sink for the given transport generation.
    #[inline]
    #[must_use]
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TransportNotice>) -> Self {
        Self { generation, tx }
    }

    /// Returns the generation this sink reports for.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports that the transport opened.
    pub fn open(&self) -> bool {
        self.notify(TransportEvent::Open)
    }

    /// Reports an incoming text frame.
    pub fn message(&self, text: impl Into<String>) -> bool {
        self.notify(TransportEvent::Message(text.into()))
    }

    /// Reports that the transport closed.
    pub fn closed(&self, code: u16, reason: impl Into<String>) -> bool {
        self.notify(TransportEvent::Close {
            code,
            reason: reason.into(),
        })
    }

    /// Delivers an event, returning `false` if the connection is gone.
    pub fn notify(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TransportNotice {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A bidirectional message-oriented transport.
///
/// Lifecycle is reported through the [`TransportSink`] given to the
/// factory, never through return values.
pub trait Transport: Send {
    /// Sends a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be handed to the transport.
    fn send(&mut self, data: String) -> Result<()>;

    /// Closes the transport with the given code and reason.
    fn close(&mut self, code: u16, reason: &str);
}

/// Creates transports for a server URL.
pub trait TransportFactory: Send + Sync {
    /// Starts opening a transport to `url`.
    ///
    /// The returned transport reports [`TransportEvent::Open`] through
    /// `sink` once it can send.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot even be started.
    fn open(&self, url: &Url, sink: TransportSink) -> Result<Box<dyn Transport>>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(7, tx);

        assert!(sink.open());
        assert!(sink.message("{}"));
        assert!(sink.closed(1000, "bye"));

        assert_eq!(
            rx.try_recv().unwrap(),
            TransportNotice {
                generation: 7,
                event: TransportEvent::Open
            }
        );
        assert_eq!(rx.try_recv().unwrap().event, TransportEvent::Message("{}".into()));
        assert_eq!(
            rx.try_recv().unwrap().event,
            TransportEvent::Close {
                code: 1000,
                reason: "bye".into()
            }
        );
    }

    #[test]
    fn test_sink_reports_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(1, tx);
        drop(rx);
        assert!(!sink.open());
    }
}
