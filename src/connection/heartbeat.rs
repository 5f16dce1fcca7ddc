//! Heartbeat monitor.
//!
//! Armed when the connection opens. Every inbound frame counts as a sign of
//! life; each heartbeat interval that passes in silence is a miss, and
//! `max_missed` consecutive misses mean the transport is half-open.
//!
//! The monitor also paces outgoing heartbeats: one is due whenever nothing
//! was sent for slightly less than the negotiated interval.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Outgoing heartbeats are sent this much earlier than the negotiated interval.
const OUTGOING_HEARTBEAT_OFFSET: Duration = Duration::from_millis(200);

/// Lower bound for any re-armed interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound on a peer-supplied `negotiatedTimeout`.
pub const MAX_NEGOTIATED_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// HeartbeatVerdict
// ============================================================================

/// Outcome of a silent heartbeat interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatVerdict {
    /// Still within tolerance; re-arm the timer.
    Tolerated {
        /// Consecutive misses so far.
        missed: u32,
    },
    /// Tolerance exceeded; the connection is dead.
    Expired,
}

// ============================================================================
// HeartbeatMonitor
// ============================================================================

/// Liveness bookkeeping for an open connection.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    fallback: Duration,
    max_missed: u32,
    negotiated: Option<Duration>,
    missed: u32,
}

impl HeartbeatMonitor {
    /// Creates an unarmed monitor.
    ///
    /// `fallback` replaces a non-positive negotiated interval.
    #[must_use]
    pub fn new(fallback: Duration, max_missed: u32) -> Self {
        Self {
            fallback,
            max_missed,
            negotiated: None,
            missed: 0,
        }
    }

    /// Arms the monitor with the interval granted in `welcome`.
    ///
    /// Returns the interval actually used, capped at
    /// [`MAX_NEGOTIATED_TIMEOUT`].
    pub fn arm(&mut self, negotiated_timeout_ms: i64) -> Duration {
        let interval = u64::try_from(negotiated_timeout_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map_or(self.fallback, |ms| {
                Duration::from_millis(ms).min(MAX_NEGOTIATED_TIMEOUT)
            });

        self.negotiated = Some(interval);
        self.missed = 0;
        interval
    }

    /// Returns the negotiated interval, once armed.
    #[inline]
    #[must_use]
    pub const fn negotiated(&self) -> Option<Duration> {
        self.negotiated
    }

    /// Returns the consecutive misses since the last inbound frame.
    #[inline]
    #[must_use]
    pub const fn missed(&self) -> u32 {
        self.missed
    }

    /// Returns the idle time after which an outgoing heartbeat is due.
    #[must_use]
    pub fn outgoing_interval(&self) -> Option<Duration> {
        self.negotiated.map(|interval| {
            interval
                .saturating_sub(OUTGOING_HEARTBEAT_OFFSET)
                .max(interval / 2)
                .max(MIN_INTERVAL)
        })
    }

    /// Records inbound traffic.
    pub fn record_activity(&mut self) {
        self.missed = 0;
    }

    /// Records a silent interval.
    pub fn record_miss(&mut self) -> HeartbeatVerdict {
        self.missed = self.missed.saturating_add(1);
        if self.missed >= self.max_missed {
            HeartbeatVerdict::Expired
        } else {
            HeartbeatVerdict::Tolerated {
                missed: self.missed,
            }
        }
    }

    /// Disarms the monitor.
    pub fn disarm(&mut self) {
        self.negotiated = None;
        self.missed = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================
