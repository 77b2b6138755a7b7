//! Leading and trailing edge rate limiting
//!
//! A `Debouncer` holds no timer of its own. Callers report each call with
//! the current instant and poll it when the reported deadline comes due,
//! which keeps it usable from the egui frame loop and from tests driven by
//! a `ManualClock`.

use std::time::{Duration, Instant};

/// What to do with a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Run now; the call was more than one window after the last run
    Now,
    /// A run is scheduled for this instant, replacing any earlier one
    Deferred(Instant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    deadline: Instant,
    /// The call that scheduled this run
    called_at: Instant,
}

/// Rate limiter with explicit state.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_run: Option<Instant>,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_run: None,
            pending: None,
        }
    }

    /// Report a call made at `now`.
    ///
    /// A call more than one window after the last run runs immediately.
    /// Any other call cancels the pending run and schedules a new one, one
    /// window after this call.
    pub fn call(&mut self, now: Instant) -> Trigger {
        let leading = match self.last_run {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.window,
        };

        if leading {
            self.pending = None;
            self.last_run = Some(now);
            return Trigger::Now;
        }

        let deadline = now + self.window;
        self.pending = Some(Pending {
            deadline,
            called_at: now,
        });
        Trigger::Deferred(deadline)
    }

    /// Fire the pending run if its deadline has passed.
    ///
    /// Returns `true` when the caller should run now. The run is recorded at
    /// the instant of the call that scheduled it.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(pending) if now >= pending.deadline => {
                self.pending = None;
                self.last_run = Some(pending.called_at);
                true
            }
            _ => false,
        }
    }

    /// Deadline of the pending run, if any.
    #[cfg(test)]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[cfg(test)]
    pub fn last_run(&self) -> Option<Instant> {
        self.last_run
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
