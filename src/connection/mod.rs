//! Resilient signaling connection.
//!
//! A connection negotiates a session with a `hello`/`welcome` handshake,
//! retries within a bounded budget, backs off when the peer answers `busy`,
//! and watches liveness with heartbeats once open.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  commands   ┌──────────────────────────────────┐
//! │ Connection │ ──────────► │ event loop (tokio task)          │
//! │  (handle)  │             │                                  │
//! └────────────┘             │   ConnectionMachine (sans-IO)    │
//!       ▲                    │   ├─ Handshake                   │
//!       │ ConnectionEvents   │   ├─ HeartbeatMonitor            │
//!       └─────────────────── │   ├─ OutboundQueue               │
//!                            │   └─ Timers                      │
//!                            └──────────────────────────────────┘
//!                                  ▲ TransportNotice   │ send/close
//!                                  │                   ▼
//!                            ┌──────────────────────────────────┐
//!                            │ Transport (WebSocket, ...)       │
//!                            └──────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | [`ConnectionState`] and allowed transitions |
//! | `options` | [`ConnectionOptions`] with defaults and validation |
//! | `event` | [`ConnectionEvent`] raised to the caller |
//! | `handshake` | Hello budget, hello id and cookie |
//! | `heartbeat` | Liveness tracking and keep-alive pacing |
//! | `queue` | Messages waiting for the handshake |
//! | `timers` | Named timer slots |
//! | `machine` | Sans-IO [`ConnectionMachine`] |
//! | `handle` | Async [`Connection`] and its event loop |

// ============================================================================
// Submodules
// ============================================================================

mod event;
mod handle;
mod handshake;
mod heartbeat;
mod machine;
mod options;
mod queue;
mod state;
mod timers;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::ConnectionEvent;
pub use handle::{Connection, ConnectionEvents};
pub use handshake::Handshake;
pub use heartbeat::{HeartbeatMonitor, HeartbeatVerdict, MAX_NEGOTIATED_TIMEOUT};
pub use machine::{ConnectionMachine, MAX_RETRY_AFTER};
pub use options::{
    ConnectionOptions, DEFAULT_MAX_CONSECUTIVE_FAILED_HELLOS,
    DEFAULT_MAX_CONSECUTIVE_MISSED_HEARTBEATS, DEFAULT_OPEN_TIMEOUT,
    DEFAULT_REQUESTED_HEARTBEAT_TIMEOUT, DEFAULT_WELCOME_TIMEOUT,
};
pub use queue::OutboundQueue;
pub use state::ConnectionState;
pub use timers::{TimerKind, Timers};
