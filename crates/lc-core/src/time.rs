//! Explicit timer state for the single-threaded scheduler.
//!
//! The engine never owns a clock. Hosts pass `now` timestamps in
//! (milliseconds since an arbitrary epoch) and drive `tick`, so every timer
//! transition is a plain state change that tests can step through.

/// Millisecond timestamp supplied by the host.
pub type Millis = u64;

// =============================================================================
// Debounce
// =============================================================================

/// Trailing-edge single-shot debounce.
///
/// Repeated triggers within the window collapse into one fire, and each new
/// trigger restarts the window. Replace-not-stack: at most one deadline is
/// ever armed.
#[derive(Debug, Clone)]
pub struct Debounce {
    deadline: Option<Millis>,
    window_ms: Millis,
}

impl Debounce {
    pub fn new(window_ms: Millis) -> Self {
        Self {
            deadline: None,
            window_ms,
        }
    }

    /// Change the window. An already-armed deadline keeps its old schedule;
    /// the next trigger uses the new window.
    pub fn set_window(&mut self, window_ms: Millis) {
        self.window_ms = window_ms;
    }

    pub fn window(&self) -> Millis {
        self.window_ms
    }

    /// (Re)arm the deadline at `now + window`.
    pub fn trigger(&mut self, now: Millis) {
        self.deadline = Some(now.saturating_add(self.window_ms));
    }

    /// Returns true exactly once when the window has elapsed, clearing the
    /// deadline.
    pub fn fire(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }
}

// =============================================================================
// OneShot
// =============================================================================

/// Single fire at a fixed delay, e.g. the post-activation warm-up pass.
#[derive(Debug, Clone, Default)]
pub struct OneShot {
    deadline: Option<Millis>,
}

impl OneShot {
    pub fn arm(&mut self, now: Millis, delay_ms: Millis) {
        self.deadline = Some(now.saturating_add(delay_ms));
    }

    /// Returns true exactly once when due.
    pub fn fire(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }
}

// =============================================================================
// RetryTimer
// =============================================================================

/// Fixed-interval retry, e.g. container acquisition polling. Re-arms itself
/// on every fire until cancelled.
#[derive(Debug, Clone)]
pub struct RetryTimer {
    deadline: Option<Millis>,
    interval_ms: Millis,
}

impl RetryTimer {
    pub fn new(interval_ms: Millis) -> Self {
        Self {
            deadline: None,
            interval_ms,
        }
    }

    pub fn arm(&mut self, now: Millis) {
        self.deadline = Some(now.saturating_add(self.interval_ms));
    }

    /// Returns true when due and immediately re-arms for the next interval.
    pub fn fire(&mut self, now: Millis) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = Some(now.saturating_add(self.interval_ms));
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Millis> {
        self.deadline
    }
}

/// Earliest of any armed deadlines.
pub fn earliest(deadlines: &[Option<Millis>]) -> Option<Millis> {
    deadlines.iter().flatten().copied().min()
}
