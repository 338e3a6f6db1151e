// Millisecond clock shared by the controllers and the runtime
//
// Timestamps are u32 and wrap after ~49.7 days. Every elapsed-time
// computation goes through `elapsed_ms`, which relies on wrapping
// subtraction so an overflow between two readings still yields the
// correct small delta.

use std::time::Instant;

/// Millisecond timestamp, wraps at `u32::MAX`
pub type Millis = u32;

/// Source of millisecond timestamps
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Time since `since`, correct across one wraparound of the clock
pub fn elapsed_ms(now: Millis, since: Millis) -> Millis {
    now.wrapping_sub(since)
}

/// Wall clock measured from process start
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        // Truncation is the wraparound
        self.origin.elapsed().as_millis() as Millis
    }
}
