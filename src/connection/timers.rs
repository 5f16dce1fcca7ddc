//! Named timer slots.
//!
//! The connection never sleeps; it records deadlines here and the driver
//! wakes it at [`Timers::next_deadline`]. Each [`TimerKind`] has exactly one
//! slot, so starting a timer replaces any earlier deadline of that kind.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// TimerKind
// ============================================================================

/// The independent timers a connection may have armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Transport must open before this fires.
    Open,
    /// `welcome` must arrive before this fires.
    Welcome,
    /// Inbound liveness check while open.
    Heartbeat,
    /// Outbound heartbeat while open and idle.
    KeepAlive,
    /// `busy` backoff.
    Backoff,
}

impl TimerKind {
    /// Every timer kind, in slot order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::Welcome,
        Self::Heartbeat,
        Self::KeepAlive,
        Self::Backoff,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::Open => 0,
            Self::Welcome => 1,
            Self::Heartbeat => 2,
            Self::KeepAlive => 3,
            Self::Backoff => 4,
        }
    }
}

// ============================================================================
// Timers
// ============================================================================

/// Deadline per [`TimerKind`].
#[derive(Debug, Clone, Default)]
pub struct Timers {
    deadlines: [Option<Instant>; 5],
}

impl Timers {
    /// Creates a set with nothing armed.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind` to fire `after` from `now`, replacing any previous deadline.
    pub fn start(&mut self, kind: TimerKind, now: Instant, after: Duration) {
        self.deadlines[kind.slot()] = Some(now + after);
    }

    /// Disarms `kind`.
    pub fn cancel(&mut self, kind: TimerKind) {
        self.deadlines[kind.slot()] = None;
    }

    /// Disarms every timer.
    pub fn cancel_all(&mut self) {
        self.deadlines = [None; 5];
    }

    /// Returns `true` if `kind` is armed.
    #[inline]
    #[must_use]
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadlines[kind.slot()].is_some()
    }

    /// Returns the deadline of `kind`, if armed.
    #[inline]
    #[must_use]
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.deadlines[kind.slot()]
    }

    /// Returns the earliest armed deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().flatten().min().copied()
    }

    /// Disarms and returns the earliest timer due at `now`.
    ///
    /// Ties resolve in [`TimerKind::ALL`] order.
    pub fn take_expired(&mut self, now: Instant) -> Option<TimerKind> {
        let kind = TimerKind::ALL
            .into_iter()
            .filter(|kind| self.deadlines[kind.slot()].is_some_and(|at| at <= now))
            .min_by_key(|kind| self.deadlines[kind.slot()])?;

        self.cancel(kind);
        Some(kind)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_replaces_previous_deadline() {
        let now = Instant::now();
        let mut timers = Timers::new();

        timers.start(TimerKind::Welcome, now, Duration::from_millis(100));
        timers.start(TimerKind::Welcome, now, Duration::from_millis(300));

        assert_eq!(
            timers.deadline(TimerKind::Welcome),
            Some(now + Duration::from_millis(300))
        );
        assert_eq!(timers.take_expired(now + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_next_deadline_is_earliest() {
        let now = Instant::now();
        let mut timers = Timers::new();
        assert_eq!(timers.next_deadline(), None);

        timers.start(TimerKind::Heartbeat, now, Duration::from_millis(500));
        timers.start(TimerKind::KeepAlive, now, Duration::from_millis(300));

        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(300)));
    }

    #[test]
    fn test_take_expired_in_deadline_order() {
        let now = Instant::now();
        let mut timers = Timers::new();
        timers.start(TimerKind::Backoff, now, Duration::from_millis(50));
        timers.start(TimerKind::Open, now, Duration::from_millis(80));

        let later = now + Duration::from_millis(100);
        assert_eq!(timers.take_expired(later), Some(TimerKind::Backoff));
        assert_eq!(timers.take_expired(later), Some(TimerKind::Open));
        assert_eq!(timers.take_expired(later), None);
        assert!(!timers.is_armed(TimerKind::Open));
    }

    #[test]
    fn test_cancel_all() {
        let now = Instant::now();
        let mut timers = Timers::new();
        for kind in TimerKind::ALL {
            timers.start(kind, now, Duration::from_millis(10));
        }

        timers.cancel_all();

        assert_eq!(timers.next_deadline(), None);
        assert_eq!(timers.take_expired(now + Duration::from_secs(1)), None);
    }
}
