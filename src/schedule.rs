use std::time::{Duration, Instant};

/// A delayed callback that is polled from the event loop.
///
/// Scheduling while a task is pending replaces it, so at most one task of a
/// kind is ever live and a superseded task never fires.
#[derive(Debug, Clone)]
pub struct ScheduledTask<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> ScheduledTask<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancels any pending task and schedules `payload` for `now + delay`.
    pub fn reschedule(&mut self, now: Instant, payload: T) {
        self.pending = Some((now + self.delay, payload));
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    /// Returns the payload once its deadline has passed, exactly once.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((deadline, _)) if now >= *deadline);
        if due {
            self.cancel()
        } else {
            None
        }
    }
}
