// SPDX-License-Identifier: MIT
//
// Deterministic periodic scheduling.
//
// Nothing here reads the clock. Callers pass `now` in, which lets the
// event loop use `Instant::now()` and lets tests step time by hand.

use std::time::{Duration, Instant};

// ─── Periodic ────────────────────────────────────────────────────────────────

/// A single repeating deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periodic {
    interval: Duration,
    next_due: Instant,
}

impl Periodic {
    /// First fires one `interval` after `now`.
    #[must_use]
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Returns `true` at most once per call when `now` has reached the
    /// deadline. Missed intervals are skipped, not replayed: after a long
    /// stall the next deadline is the first one strictly after `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        if self.interval.is_zero() {
            self.next_due = now;
            return true;
        }
        let late = now - self.next_due;
        let skipped = late.as_nanos() / self.interval.as_nanos();
        // Saturate: a stall longer than u32::MAX intervals is not a real case.
        let steps = u32::try_from(skipped + 1).unwrap_or(u32::MAX);
        self.next_due += self.interval * steps;
        true
    }

    /// Time left until the deadline (zero when already due).
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// A set of periodic tasks identified by `T`.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    tasks: Vec<(T, Periodic)>,
}

impl<T: Clone> Scheduler<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Register `task` to fire every `interval`, starting one interval
    /// after `now`.
    pub fn every(&mut self, task: T, interval: Duration, now: Instant) {
        self.tasks.push((task, Periodic::new(interval, now)));
    }

    /// Tasks due at `now`, in registration order. Each fires at most once.
    pub fn due(&mut self, now: Instant) -> Vec<T> {
        self.tasks
            .iter_mut()
            .filter_map(|(task, timer)| timer.fire(now).then(|| task.clone()))
            .collect()
    }

    /// Time until the earliest deadline, or `None` with no tasks.
    #[must_use]
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.tasks.iter().map(|(_, timer)| timer.remaining(now)).min()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<T: Clone> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
