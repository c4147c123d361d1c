use std::time::{Duration, Instant};

/// Fixed-interval ticker driving address-line reconciliation. The event
/// loop asks it whether a check is due; the armed/disarmed state itself
/// lives on the navigator.
pub struct Watchdog {
    interval: Duration,
    last: Instant,
}

impl Watchdog {
    pub fn new(interval_ms: u64) -> Watchdog {
        Watchdog {
            interval: Duration::from_millis(interval_ms.max(1)),
            last: Instant::now(),
        }
    }

    /// True once per interval.
    pub fn due(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }
}
