use tokio::time::{Duration, Instant};

/// One-shot timer driven by the caller's clock.
///
/// The timer never fires on its own: the owner asks for the
/// [`deadline`](Self::deadline) and calls [`fire_if_due`](Self::fire_if_due)
/// once that instant has passed. A cancelled timer never fires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTimer {
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any pending deadline.
    pub fn arm(&mut self, now: Instant, interval: Duration) {
        self.deadline = Some(now + interval);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarms and returns true if the deadline has been reached.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
