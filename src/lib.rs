//! Resilient signaling - a self-healing signaling channel over WebSocket.
//!
//! This library keeps a logical session alive on top of an unreliable,
//! message-oriented transport: it negotiates with a `hello`/`welcome`
//! handshake, retries a bounded number of times, honours `busy` backoff with
//! a session cookie, and detects half-open transports with heartbeats.
//!
//! # Architecture
//!
//! - **Connection**: async handle; owns a task driving the state machine
//! - **ConnectionMachine**: sans-IO protocol core, driven by explicit time
//! - **Transport**: pluggable adapter; WebSocket via tokio-tungstenite by default
//! - **EventObserver**: receives one notification per state transition
//!
//! # Quick Start
//!
//! ```no_run
//! use resilient_signaling::{Connection, ConnectionEvent, ConnectionOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (connection, mut events) =
//!         Connection::new("wss://signaling.example.com/v2", ConnectionOptions::default())?;
//!
//!     // Queued until the handshake completes
//!     connection.send_message(serde_json::json!({ "join": "room-1" }));
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             ConnectionEvent::Message(body) => println!("received {body}"),
//!             ConnectionEvent::Close(error) => {
//!                 println!("closed: {error:?}");
//!                 break;
//!             }
//!             _ => {}
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`connection`] | [`Connection`], [`ConnectionMachine`] and their parts |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`observer`] | State transition observer |
//! | [`protocol`] | Envelopes, codec and close codes |
//! | [`transport`] | Transport traits and the WebSocket adapter |

// ============================================================================
// Modules
// ============================================================================

/// Signaling connection: handle, state machine, handshake and heartbeats.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Observer notified on every state transition.
pub mod observer;

/// Wire envelopes, codec and close codes.
pub mod protocol;

/// Transport abstraction and default WebSocket adapter.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Connection types
pub use connection::{
    Connection, ConnectionEvent, ConnectionEvents, ConnectionMachine, ConnectionOptions,
    ConnectionState,
};

// Error types
pub use error::{CloseError, Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, HelloId};

// Observer types
pub use observer::{EventLevel, EventObserver, NoopObserver, ObserverEvent, TracingObserver};

// Protocol types
pub use protocol::{CloseCode, CloseReason, Envelope};

// Transport types
pub use transport::{Transport, TransportEvent, TransportFactory, TransportSink, WebSocketFactory};
