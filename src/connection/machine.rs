//! Sans-IO connection state machine.
//!
//! [`ConnectionMachine`] owns all protocol state: the handshake, the
//! heartbeat monitor, the outbound queue, the timer slots and the active
//! transport. It never sleeps and never spawns. Callers feed it transport
//! notices and the current time, then drain [`ConnectionMachine::poll_event`]
//! and sleep until [`ConnectionMachine::poll_timeout`].
//!
//! # States
//!
//! ```text
//! Early ──open──▶ Connecting ──welcome──▶ Open
//!   ▲                 │  ▲                  │
//!   │               busy │backoff           │
//!   │                 ▼  │                  │
//!   └──backoff──────  Wait                  │
//!                                           ▼
//!          (any state) ──────────────▶ Closed
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use url::Url;

use crate::connection::{
    ConnectionEvent, ConnectionOptions, ConnectionState, Handshake, HeartbeatMonitor,
    HeartbeatVerdict, OutboundQueue, TimerKind, Timers,
};
use crate::error::{CloseError, Error, Result};
use crate::identifiers::ConnectionId;
use crate::observer::ObserverEvent;
use crate::protocol::{Busy, CloseCode, CloseReason, Envelope, Welcome, codec};
use crate::transport::{
    ABNORMAL_CLOSURE, Transport, TransportEvent, TransportNotice, TransportSink,
};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on a peer-supplied `retryAfter`.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

// ============================================================================
// Types
// ============================================================================

/// How the handshake resumes when the backoff timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    /// Resend `hello` on the current transport.
    SameTransport,
    /// Ask the factory for a new transport.
    NewTransport,
}

/// The transport currently owned by the machine.
struct ActiveTransport {
    generation: u64,
    open: bool,
    inner: Box<dyn Transport>,
}

// ============================================================================
// ConnectionMachine
// ============================================================================

/// Protocol state for one logical connection.
pub struct ConnectionMachine {
    id: ConnectionId,
    url: Url,
    options: ConnectionOptions,
    state: ConnectionState,
    handshake: Handshake,
    heartbeat: HeartbeatMonitor,
    queue: OutboundQueue,
    timers: Timers,
    transport: Option<ActiveTransport>,
    next_generation: u64,
    transport_tx: mpsc::UnboundedSender<TransportNotice>,
    resume: Option<Resume>,
    events: VecDeque<ConnectionEvent>,
}

impl fmt::Debug for ConnectionMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionMachine")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .field("generation", &self.transport.as_ref().map(|t| t.generation))
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionMachine - Constructor
// ============================================================================

impl ConnectionMachine {
    /// Creates a machine in [`ConnectionState::Early`] and opens the first
    /// transport.
    ///
    /// Transport notices must be delivered through
    /// [`handle_transport_event`](Self::handle_transport_event); the
    /// transports send them on `transport_tx`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid options, or whatever the
    /// transport factory returns.
    pub fn new(
        url: Url,
        options: ConnectionOptions,
        transport_tx: mpsc::UnboundedSender<TransportNotice>,
        now: Instant,
    ) -> Result<Self> {
        options.validate()?;

        let handshake = Handshake::new(
            options.requested_heartbeat_timeout,
            options.hello_body.clone(),
            options.max_consecutive_failed_hellos,
        );
        let heartbeat = HeartbeatMonitor::new(
            options.requested_heartbeat_timeout,
            options.max_consecutive_missed_heartbeats,
        );

        let mut machine = Self {
            id: ConnectionId::generate(),
            url,
            options,
            state: ConnectionState::Early,
            handshake,
            heartbeat,
            queue: OutboundQueue::new(),
            timers: Timers::new(),
            transport: None,
            next_generation: 0,
            transport_tx,
            resume: None,
            events: VecDeque::new(),
        };

        debug!(connection_id = %machine.id, url = %machine.url, "Creating connection");
        machine.notify_observer(ObserverEvent::state(machine.id, ConnectionState::Early));
        machine.open_transport(now)?;

        Ok(machine)
    }
}

// ============================================================================
// ConnectionMachine - Accessors
// ============================================================================

impl ConnectionMachine {
    /// Returns the connection identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the cookie attached to outgoing hellos.
    #[inline]
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.handshake.cookie()
    }

    /// Returns the heartbeat interval granted by the peer.
    #[inline]
    #[must_use]
    pub const fn negotiated_heartbeat_timeout(&self) -> Option<Duration> {
        self.heartbeat.negotiated()
    }

    /// Returns consecutive heartbeat intervals without inbound traffic.
    #[inline]
    #[must_use]
    pub const fn missed_heartbeats(&self) -> u32 {
        self.heartbeat.missed()
    }

    /// Returns the number of messages waiting for the connection to open.
    #[inline]
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns the earliest armed timer deadline.
    #[inline]
    #[must_use]
    pub fn poll_timeout(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Pops the next event for the caller.
    #[inline]
    pub fn poll_event(&mut self) -> Option<ConnectionEvent> {
        self.events.pop_front()
    }
}

// ============================================================================
// ConnectionMachine - Caller Operations
// ============================================================================

impl ConnectionMachine {
    /// Sends an application message, or queues it until the connection opens.
    ///
    /// Messages sent after close are discarded.
    pub fn send_message(&mut self, body: Value, now: Instant) {
        match self.state {
            ConnectionState::Open => {
                self.transmit(&Envelope::msg(body), now);
            }
            ConnectionState::Closed => {
                trace!(connection_id = %self.id, "Discarding message after close");
            }
            _ => {
                self.queue.push(Envelope::msg(body));
                trace!(connection_id = %self.id, queued = self.queue.len(), "Message queued");
            }
        }
    }

    /// Closes the connection normally. Idempotent.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }

        if self.state.is_open() {
            self.send_bye();
        }

        self.shutdown(CloseCode::Normal, "Normal");
    }

    /// Closes the connection after the host's network changed.
    pub fn network_changed(&mut self, kind: Option<&str>) {
        if self.state.is_closed() {
            return;
        }

        let reason = match kind {
            Some(kind) => format!("Network changed to {kind}"),
            None => "Network changed".to_string(),
        };
        debug!(connection_id = %self.id, "{reason}");
        self.shutdown(CloseCode::NetworkChanged, reason);
    }
}

// ============================================================================
// ConnectionMachine - Transport Events
// ============================================================================

impl ConnectionMachine {
    /// Applies a notice from a transport.
    ///
    /// Notices from transports other than the active one are ignored.
    pub fn handle_transport_event(&mut self, notice: TransportNotice, now: Instant) {
        if self.state.is_closed() {
            trace!(connection_id = %self.id, "Ignoring transport event after close");
            return;
        }

        let active = self.transport.as_ref().map(|t| t.generation);
        if active != Some(notice.generation) {
            trace!(
                connection_id = %self.id,
                generation = notice.generation,
                ?active,
                "Ignoring stale transport event"
            );
            return;
        }

        match notice.event {
            TransportEvent::Open => self.on_transport_open(now),
            TransportEvent::Message(text) => self.on_transport_message(&text, now),
            TransportEvent::Close { code, reason } => {
                debug!(connection_id = %self.id, code, %reason, "Transport closed by remote");
                // Already closed; shutdown must not close it again.
                self.transport = None;
                let code = CloseCode::from_u16(code);
                let cause = match code {
                    CloseCode::Normal => CloseReason::Remote,
                    other => other.close_reason(),
                };
                self.shutdown_as(code, cause, reason);
            }
        }
    }

    fn on_transport_open(&mut self, now: Instant) {
        self.timers.cancel(TimerKind::Open);
        if let Some(transport) = self.transport.as_mut() {
            transport.open = true;
        }

        if self.state == ConnectionState::Early {
            self.start_handshake(now);
        } else {
            warn!(connection_id = %self.id, state = %self.state, "Unexpected transport open");
        }
    }

    fn on_transport_message(&mut self, text: &str, now: Instant) {
        if self.state.is_open() {
            self.heartbeat.record_activity();
            if let Some(interval) = self.heartbeat.negotiated() {
                self.timers.start(TimerKind::Heartbeat, now, interval);
            }
        }

        let envelope = match codec::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(connection_id = %self.id, error = %e, "Failed to decode incoming message");
                self.events.push_back(ConnectionEvent::Error(e));
                return;
            }
        };

        trace!(connection_id = %self.id, kind = envelope.type_name(), "Received");

        match envelope {
            Envelope::Welcome(welcome) => self.on_welcome(welcome, now),
            Envelope::Busy(busy) => self.on_busy(busy, now),
            Envelope::Bad { reason } => self.on_bad(reason),
            Envelope::Msg { body } => {
                if self.state.is_open() {
                    self.events.push_back(ConnectionEvent::Message(body));
                } else {
                    debug!(connection_id = %self.id, state = %self.state, "Dropping \"msg\" before open");
                }
            }
            Envelope::Heartbeat => {}
            Envelope::Bye => {
                debug!(connection_id = %self.id, "Ignoring \"bye\" from peer");
            }
            Envelope::Hello(_) => {
                self.events
                    .push_back(ConnectionEvent::Error(Error::protocol("Unexpected \"hello\" message")));
            }
        }
    }
}

// ============================================================================
// ConnectionMachine - Handshake
// ============================================================================

impl ConnectionMachine {
    /// Starts a new handshake cycle with a fresh hello id.
    fn start_handshake(&mut self, now: Instant) {
        self.handshake.begin_cycle();
        self.send_hello(now);
    }

    /// Sends the next `hello`, or closes once the budget is spent.
    fn send_hello(&mut self, now: Instant) {
        let Some(hello) = self.handshake.next_hello() else {
            let reason = "\"welcome\" message timeout expired";
            warn!(connection_id = %self.id, attempts = self.handshake.attempts(), "{reason}");
            self.shutdown(CloseCode::HandshakeExhausted, reason);
            return;
        };

        self.enter(ConnectionState::Connecting);
        debug!(
            connection_id = %self.id,
            hello_id = %hello.id,
            attempt = self.handshake.attempts(),
            cookie = hello.cookie.is_some(),
            "Sending \"hello\""
        );

        if self.transmit(&Envelope::Hello(hello), now) {
            self.timers
                .start(TimerKind::Welcome, now, self.options.welcome_timeout);
        }
    }

    fn on_welcome(&mut self, welcome: Welcome, now: Instant) {
        if self.state != ConnectionState::Connecting {
            warn!(connection_id = %self.id, state = %self.state, "Ignoring unexpected \"welcome\"");
            return;
        }

        self.handshake.complete();
        self.timers.cancel(TimerKind::Welcome);
        self.timers.cancel(TimerKind::Backoff);
        self.resume = None;

        let interval = self.heartbeat.arm(welcome.negotiated_timeout);
        self.timers.start(TimerKind::Heartbeat, now, interval);
        if let Some(keep_alive) = self.heartbeat.outgoing_interval() {
            self.timers.start(TimerKind::KeepAlive, now, keep_alive);
        }
        debug!(connection_id = %self.id, negotiated_ms = interval.as_millis(), "Received \"welcome\"");

        let pending: Vec<Envelope> = self.queue.drain().collect();
        if !pending.is_empty() {
            debug!(connection_id = %self.id, count = pending.len(), "Flushing queued messages");
        }
        for envelope in &pending {
            if !self.transmit(envelope, now) {
                return;
            }
        }

        self.enter(ConnectionState::Open);
        self.events.push_back(ConnectionEvent::Open);
    }

    fn on_busy(&mut self, busy: Busy, now: Instant) {
        if !matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Wait
        ) {
            warn!(connection_id = %self.id, state = %self.state, "Ignoring unexpected \"busy\"");
            return;
        }

        self.timers.cancel(TimerKind::Welcome);
        self.timers.cancel(TimerKind::Backoff);

        if busy.is_terminal() {
            let reason = "Received terminal \"busy\" message";
            warn!(connection_id = %self.id, "{reason}");
            self.shutdown(CloseCode::Rejected, reason);
            return;
        }

        self.handshake.adopt_cookie(busy.cookie);

        let retry_after = u64::try_from(busy.retry_after)
            .map(Duration::from_millis)
            .unwrap_or_default()
            .min(MAX_RETRY_AFTER);
        let reason = format!(
            "Received \"busy\" message, retrying after {} ms",
            retry_after.as_millis()
        );
        warn!(connection_id = %self.id, keep_alive = busy.keep_alive, "{reason}");

        let resume = if busy.keep_alive {
            Resume::SameTransport
        } else {
            self.retire_transport(CloseCode::BusyWait, &reason);
            Resume::NewTransport
        };
        self.resume = Some(resume);
        self.timers.start(TimerKind::Backoff, now, retry_after);

        self.enter(ConnectionState::Wait);
        self.events.push_back(ConnectionEvent::Wait {
            keep_alive: busy.keep_alive,
            retry_after,
        });
    }

    fn on_bad(&mut self, reason: String) {
        match self.state {
            ConnectionState::Open => {
                debug!(connection_id = %self.id, %reason, "Received \"bad\"");
                self.events
                    .push_back(ConnectionEvent::Error(Error::protocol(reason)));
            }
            ConnectionState::Closed => {}
            _ => {
                warn!(connection_id = %self.id, %reason, "Closing after \"bad\"");
                self.shutdown(CloseCode::ProtocolViolation, reason);
            }
        }
    }
}

// ============================================================================
// ConnectionMachine - Timers
// ============================================================================

impl ConnectionMachine {
    /// Fires every timer due at `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        while let Some(kind) = self.timers.take_expired(now) {
            if self.state.is_closed() {
                break;
            }
            trace!(connection_id = %self.id, timer = ?kind, "Timer fired");

            match kind {
                TimerKind::Open => {
                    let reason = format!(
                        "Failed to open in {} ms",
                        self.options.open_timeout.as_millis()
                    );
                    warn!(connection_id = %self.id, "{reason}");
                    self.shutdown(CloseCode::OpenTimeout, reason);
                }
                TimerKind::Welcome => {
                    if self.state == ConnectionState::Connecting {
                        self.send_hello(now);
                    }
                }
                TimerKind::Heartbeat => self.on_heartbeat_expired(now),
                TimerKind::KeepAlive => {
                    if self.state.is_open() {
                        self.transmit(&Envelope::Heartbeat, now);
                    }
                }
                TimerKind::Backoff => self.on_backoff_expired(now),
            }
        }
    }

    fn on_heartbeat_expired(&mut self, now: Instant) {
        if !self.state.is_open() {
            return;
        }

        match self.heartbeat.record_miss() {
            HeartbeatVerdict::Tolerated { missed } => {
                debug!(connection_id = %self.id, missed, "Missed heartbeat");
                if let Some(interval) = self.heartbeat.negotiated() {
                    self.timers.start(TimerKind::Heartbeat, now, interval);
                }
            }
            HeartbeatVerdict::Expired => {
                let reason = format!(
                    "Missed {} \"heartbeat\" messages",
                    self.options.max_consecutive_missed_heartbeats
                );
                warn!(connection_id = %self.id, "{reason}");
                self.shutdown(CloseCode::HeartbeatTimeout, reason);
            }
        }
    }

    fn on_backoff_expired(&mut self, now: Instant) {
        match self.resume.take() {
            Some(Resume::SameTransport) => self.start_handshake(now),
            Some(Resume::NewTransport) => {
                self.enter(ConnectionState::Early);
                if let Err(e) = self.open_transport(now) {
                    warn!(connection_id = %self.id, error = %e, "Failed to reopen transport");
                    self.shutdown(CloseCode::Other(ABNORMAL_CLOSURE), e.to_string());
                }
            }
            None => {}
        }
    }
}

// ============================================================================
// ConnectionMachine - Internal
// ============================================================================

impl ConnectionMachine {
    fn open_transport(&mut self, now: Instant) -> Result<()> {
        let generation = self.next_generation;
        self.next_generation += 1;

        let sink = TransportSink::new(generation, self.transport_tx.clone());
        let inner = self.options.transport_factory.open(&self.url, sink)?;

        self.transport = Some(ActiveTransport {
            generation,
            open: false,
            inner,
        });
        self.timers
            .start(TimerKind::Open, now, self.options.open_timeout);

        debug!(connection_id = %self.id, generation, "Opening transport");
        Ok(())
    }

    /// Closes and forgets the active transport without closing the connection.
    fn retire_transport(&mut self, code: CloseCode, reason: &str) {
        self.timers.cancel(TimerKind::Open);
        if let Some(mut transport) = self.transport.take() {
            debug!(connection_id = %self.id, generation = transport.generation, %code, "Retiring transport");
            transport.inner.close(code.as_u16(), reason);
        }
    }

    /// Sends an envelope on the open transport.
    ///
    /// Returns `false` if the connection was closed because sending failed.
    fn transmit(&mut self, envelope: &Envelope, now: Instant) -> bool {
        let result = codec::encode(envelope).and_then(|text| match self.transport.as_mut() {
            Some(transport) if transport.open => transport.inner.send(text),
            _ => Err(Error::ConnectionClosed),
        });

        match result {
            Ok(()) => {
                trace!(connection_id = %self.id, kind = envelope.type_name(), "Sent");
                if let Some(interval) = self.heartbeat.outgoing_interval() {
                    self.timers.start(TimerKind::KeepAlive, now, interval);
                }
                true
            }
            Err(e) => {
                warn!(connection_id = %self.id, error = %e, kind = envelope.type_name(), "Send failed");
                self.shutdown(CloseCode::SendFailed, "Failed to send message");
                false
            }
        }
    }

    /// Best-effort `bye` before a normal close.
    fn send_bye(&mut self) {
        let Some(transport) = self.transport.as_mut().filter(|t| t.open) else {
            return;
        };

        let result = codec::encode(&Envelope::Bye).and_then(|text| transport.inner.send(text));
        if let Err(e) = result {
            debug!(connection_id = %self.id, error = %e, "Failed to send \"bye\"");
        }
    }

    /// Moves to `next`, notifying the caller and the observer.
    ///
    /// Re-entering the current state does nothing.
    fn enter(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );

        debug!(connection_id = %self.id, from = %self.state, to = %next, "State transition");
        self.state = next;
        self.events.push_back(ConnectionEvent::StateChanged(next));

        if !next.is_closed() {
            self.notify_observer(ObserverEvent::state(self.id, next));
        }
    }

    /// Terminal transition. Every path into `Closed` goes through here.
    fn shutdown(&mut self, code: CloseCode, reason: impl Into<String>) {
        self.shutdown_as(code, code.close_reason(), reason);
    }

    /// Like [`shutdown`](Self::shutdown), with an explicit reason for the
    /// observer. A peer may close with 1000, which is still not a local close.
    fn shutdown_as(&mut self, code: CloseCode, cause: CloseReason, reason: impl Into<String>) {
        if self.state.is_closed() {
            return;
        }
        let reason = reason.into();

        self.timers.cancel_all();
        self.queue.clear();
        self.handshake.reset();
        self.heartbeat.disarm();
        self.resume = None;

        if let Some(mut transport) = self.transport.take() {
            transport.inner.close(code.as_u16(), &reason);
        }

        if code == CloseCode::Normal {
            debug!(connection_id = %self.id, "Closed");
        } else {
            warn!(connection_id = %self.id, %code, %reason, "Closed");
        }

        self.enter(ConnectionState::Closed);
        self.notify_observer(ObserverEvent::closed(self.id, cause));

        let error = (code != CloseCode::Normal).then(|| CloseError::new(code, reason));
        self.events.push_back(ConnectionEvent::Close(error));
    }

    fn notify_observer(&self, event: ObserverEvent) {
        self.options.event_observer.emit(event);
    }
}

// ============================================================================
// Tests
// ============================================================================
