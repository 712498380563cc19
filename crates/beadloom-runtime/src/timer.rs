#![forbid(unsafe_code)]

//! Poll-driven timers.
//!
//! Neither timer owns a thread or a callback. The host polls them with the
//! current instant, which keeps the store single-threaded and lets tests
//! drive time through a [`ManualClock`](crate::clock::ManualClock).

use std::time::Duration;

use web_time::Instant;

/// A cancel-and-reschedule debounce.
///
/// `restart` pushes the deadline out by the idle window; once `now` passes
/// the deadline the timer reports expired until it is restarted again.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    window: Duration,
    deadline: Option<Instant>,
}

impl IdleTimer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is scheduled (expired or not).
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// A fixed-period interval. `poll` fires at most once per call.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    next: Instant,
}

impl IntervalTimer {
    #[must_use]
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    /// Returns true when the period has elapsed and reschedules from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next = now + self.period;
        true
    }
}
