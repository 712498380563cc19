#![forbid(unsafe_code)]

//! Time sources.
//!
//! The store reads time through [`Clock`] so that idle windows and backup
//! intervals can be driven deterministically in tests. [`SystemClock`] uses
//! `web_time`, which maps to `std::time` natively and to `performance.now()`
//! / `Date.now()` on wasm.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic and wall-clock time.
pub trait Clock {
    /// Monotonic instant used for idle and interval timing.
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch, used for `updatedAt`
    /// stamps and backup slot names.
    fn epoch_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            })
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same elapsed time, so a test can hand one clone to a
/// store and keep another to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    epoch_origin_ms: u64,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(epoch_origin_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            epoch_origin_ms,
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn epoch_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.elapsed.get().as_millis()).unwrap_or(u64::MAX);
        self.epoch_origin_ms.saturating_add(elapsed)
    }
}
