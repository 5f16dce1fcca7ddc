//! Async connection handle and event loop.
//!
//! [`Connection::new`] builds a [`ConnectionMachine`] and spawns a task that
//! owns it. The task is the only place the machine is touched, so there is
//! no locking around protocol state; the handle talks to it over a command
//! channel and events come back on [`ConnectionEvents`].
//!
//! # Event Loop
//!
//! The task `select!`s over:
//!
//! - Commands from any [`Connection`] clone
//! - Lifecycle notices from the active transport
//! - The machine's earliest timer deadline
//!
//! It exits once the machine reaches [`ConnectionState::Closed`]. Dropping
//! every [`Connection`] clone closes the connection normally.

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{Instrument, debug, debug_span, trace};
use url::Url;

use crate::connection::{ConnectionEvent, ConnectionMachine, ConnectionOptions, ConnectionState};
use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;
use crate::transport::TransportNotice;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Requests from the handle to the event loop.
enum ConnectionCommand {
    /// Send or queue an application message.
    Send(Value),
    /// Close normally.
    Close,
    /// Close after a network change.
    NetworkChanged(Option<String>),
}

// ============================================================================
// ConnectionEvents
// ============================================================================

/// Receiving half of a connection's events.
///
/// Ends after [`ConnectionEvent::Close`].
#[derive(Debug)]
pub struct ConnectionEvents {
    rx: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl ConnectionEvents {
    /// Waits for the next event. Returns `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.rx.recv().await
    }

    /// Returns the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ConnectionEvents {
    type Item = ConnectionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to a resilient signaling connection.
///
/// Cheap to clone; every clone drives the same connection.
///
/// # Example
///
/// ```ignore
/// use resilient_signaling::{Connection, ConnectionEvent, ConnectionOptions};
///
/// let (connection, mut events) =
///     Connection::new("wss://signaling.example.com/v2", ConnectionOptions::default())?;
///
/// connection.send_message(serde_json::json!({ "hello": "world" }));
///
/// while let Some(event) = events.recv().await {
///     if let ConnectionEvent::Message(body) = event {
///         println!("{body}");
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    state: Arc<Mutex<ConnectionState>>,
}

impl Connection {
    /// Creates a connection to `url` and starts the handshake.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::Config`] if `options` are invalid
    /// - [`Error::Connection`] outside a runtime, or if the first transport
    ///   cannot be created
    pub fn new(url: &str, options: ConnectionOptions) -> Result<(Self, ConnectionEvents)> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::connection("Connection must be created within a tokio runtime"))?;
        let url = Url::parse(url)?;

        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let machine = ConnectionMachine::new(url, options, transport_tx, Instant::now())?;

        let id = machine.id();
        let state = Arc::new(Mutex::new(machine.state()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let span = debug_span!("connection", connection_id = %id);
        runtime.spawn(
            run_event_loop(
                machine,
                command_rx,
                transport_rx,
                event_tx,
                Arc::clone(&state),
            )
            .instrument(span),
        );

        Ok((
            Self {
                id,
                command_tx,
                state,
            },
            ConnectionEvents { rx: event_rx },
        ))
    }

    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the state as of the last processed input.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Sends `body` now if open, otherwise queues it until the handshake
    /// completes. Discarded once closed.
    pub fn send_message(&self, body: Value) {
        if self.command_tx.send(ConnectionCommand::Send(body)).is_err() {
            trace!(connection_id = %self.id, "Discarding message after close");
        }
    }

    /// Serializes `body` and sends it like [`send_message`](Self::send_message).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `body` cannot be serialized.
    pub fn send<T: Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        let value = serde_json::to_value(body)?;
        self.send_message(value);
        Ok(())
    }

    /// Closes the connection normally. Idempotent.
    pub fn close(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Close);
    }

    /// Closes the connection because the host's network changed.
    pub fn network_changed(&self, kind: Option<&str>) {
        let _ = self
            .command_tx
            .send(ConnectionCommand::NetworkChanged(kind.map(str::to_owned)));
    }
}

// ============================================================================
// Event Loop
// ============================================================================

async fn run_event_loop(
    mut machine: ConnectionMachine,
    mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    mut transport_rx: mpsc::UnboundedReceiver<TransportNotice>,
    event_tx: mpsc::UnboundedSender<ConnectionEvent>,
    state: Arc<Mutex<ConnectionState>>,
) {
    loop {
        *state.lock() = machine.state();
        while let Some(event) = machine.poll_event() {
            // The caller may have dropped the receiver; keep running anyway.
            let _ = event_tx.send(event);
        }

        if machine.state().is_closed() {
            break;
        }

        let deadline = machine.poll_timeout();

        tokio::select! {
            command = command_rx.recv() => match command {
                Some(ConnectionCommand::Send(body)) => machine.send_message(body, Instant::now()),
                Some(ConnectionCommand::Close) => machine.close(),
                Some(ConnectionCommand::NetworkChanged(kind)) => {
                    machine.network_changed(kind.as_deref());
                }
                None => {
                    debug!("Every handle dropped, closing");
                    machine.close();
                }
            },

            Some(notice) = transport_rx.recv() => {
                machine.handle_transport_event(notice, Instant::now());
            }

            () = wait_until(deadline) => {
                machine.handle_timeout(Instant::now());
            }
        }
    }

    debug!("Event loop terminated");
}

/// Sleeps until `deadline`, or forever if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
