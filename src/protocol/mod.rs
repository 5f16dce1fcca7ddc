//! Signaling protocol message types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `hello` | Local → Remote | Start or retry the handshake |
//! | `welcome` | Remote → Local | Accept the handshake, grant heartbeat interval |
//! | `busy` | Remote → Local | Back off, optionally with a resumption cookie |
//! | `bad` | Remote → Local | Report a rejected message |
//! | `heartbeat` | Both | Keep an idle session alive |
//! | `msg` | Both | Carry an opaque application payload |
//! | `bye` | Local → Remote | Graceful goodbye |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `close` | Close codes and reasons |
//! | `codec` | Text frame encoding/decoding |
//! | `envelope` | Envelope types |

// ============================================================================
// Submodules
// ============================================================================

/// Close codes and reasons.
pub mod close;

/// Text frame encoding and decoding.
pub mod codec;

/// Envelope types.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use close::{CloseCode, CloseReason};
pub use codec::{decode, encode};
pub use envelope::{Busy, Envelope, Hello, PROTOCOL_VERSION, Welcome};
