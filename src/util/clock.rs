//! Tick clocks read by delegates and time domains.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of monotonic tick time.
pub trait TickClock: Send + Sync {
    /// Current tick time.
    fn now_ticks(&self) -> Instant;
}

/// The system monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTickClock;

impl TickClock for DefaultTickClock {
    fn now_ticks(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used for deterministic tests of
/// delayed work.
pub struct TestTickClock {
    now: Mutex<Instant>,
}

impl TestTickClock {
    /// Clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }
}

impl Default for TestTickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock for TestTickClock {
    fn now_ticks(&self) -> Instant {
        *self.now.lock()
    }
}

impl fmt::Debug for TestTickClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestTickClock").field("now", &*self.now.lock()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_only_moves_when_advanced() {
        let clock = TestTickClock::new();
        let start = clock.now_ticks();
        assert_eq!(clock.now_ticks(), start);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_ticks(), start + Duration::from_millis(250));
    }

    #[test]
    fn test_default_clock_is_monotonic() {
        let a = DefaultTickClock.now_ticks();
        let b = DefaultTickClock.now_ticks();
        assert!(b >= a);
    }
}
