use std::time::{Duration, Instant};

/// A fixed-period timer driven by the caller's clock
///
/// The timer never reads the clock itself: every query takes `now`,
/// so a poll loop (or a test) decides what time it is. A timer which
/// has never fired is due immediately.
///
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    last_fired: Option<Instant>,
}

impl IntervalTimer {
    /// Create a new [`IntervalTimer`], due immediately
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    /// The fixed period of this timer
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// When the timer last fired, if it ever has
    #[must_use]
    pub const fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    /// Whether a full period has elapsed since the timer last fired
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_fired.map_or(true, |last| {
            now.saturating_duration_since(last) >= self.period
        })
    }

    /// Record that the timer fired at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_fired = Some(now);
    }

    /// Make the timer due immediately again
    pub fn reset(&mut self) {
        self.last_fired = None;
    }

    /// How long until the timer is next due (zero if already due)
    #[must_use]
    pub fn until_due(&self, now: Instant) -> Duration {
        self.last_fired.map_or(Duration::ZERO, |last| {
            (last + self.period).saturating_duration_since(now)
        })
    }
}
