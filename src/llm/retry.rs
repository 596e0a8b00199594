//! Fixed retry delay schedules.
//!
//! Delays are explicit per-use-case tables rather than a backoff formula:
//! the escalation profile for re-generating a whole summary is deliberately
//! slower than the one for a single chat turn.

use std::time::Duration;

/// Escalating delays between summary regeneration attempts.
pub const SUMMARY_RETRY_SCHEDULE: RetrySchedule = RetrySchedule::new(&[
    Duration::from_secs(10),
    Duration::from_secs(20),
    Duration::from_secs(30),
    Duration::from_secs(40),
    Duration::from_secs(50),
    Duration::from_secs(60),
]);

/// Delays between chat turn attempts.
pub const CHAT_RETRY_SCHEDULE: RetrySchedule = RetrySchedule::new(&[
    Duration::from_secs(2),
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(30),
    Duration::from_secs(60),
]);

/// A bounded, indexed table of retry delays.
///
/// Failure classification (whether an error is worth re-issuing at all) lives
/// on [`crate::Error::is_retryable`]; a schedule only answers "how long to
/// wait before attempt N".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: &'static [Duration],
}

impl RetrySchedule {
    pub const fn new(delays: &'static [Duration]) -> Self {
        Self { delays }
    }

    /// Number of retry attempts the schedule allows.
    pub const fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Delay before the retry with the given zero-based index.
    ///
    /// Returns `None` past the end of the table; callers check
    /// [`attempts`](Self::attempts) before scheduling.
    pub fn delay(&self, attempt_index: usize) -> Option<Duration> {
        self.delays.get(attempt_index).copied()
    }
}
