use std::time::Duration;

use instant::Instant;

/// Most ticks delivered at once after a stall before we give up catching
/// up and resync (prevents a burst of stale ticks after a long block).
pub const MAX_CATCH_UP: u32 = 5;

/// Fixed-period tick source polled from the event loop.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
}

impl Ticker {
    pub fn new(period: Duration, now: Instant) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next_due: now + period,
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.next_due = now + self.period;
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Number of periods that have elapsed since the last poll.
    pub fn poll(&mut self, now: Instant) -> u32 {
        if now < self.next_due {
            return 0;
        }
        let behind = now.saturating_duration_since(self.next_due);
        let due = 1 + behind.as_nanos() / self.period.as_nanos();
        if due > u128::from(MAX_CATCH_UP) {
            self.next_due = now + self.period;
            return MAX_CATCH_UP;
        }
        // `due` <= MAX_CATCH_UP here.
        let due = due as u32;
        self.next_due += self.period * due;
        due
    }
}
