//! Consecutive-failure escalation
//!
//! Counts consecutive failed cycles and says how long to back off. Below the
//! threshold the loop takes a short pause; at the threshold it takes a long
//! pause and the count starts over.
//!
//! Two ladders share the counter:
//!
//! - **Work failures** (a send that failed after retries): short pause, then
//!   long pause at the threshold.
//! - **Loop errors** (anything else that aborts a cycle): a first-error
//!   delay, a repeat delay, then the long pause at the threshold.
//!
//! The count is always within `[0, threshold]`.

use cadence_core::config::{BreakerConfig, ScheduleConfig};
use std::time::Duration;

/// What the loop should do after a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerAdvice {
    /// Wait this long, keep running
    Backoff(Duration),
    /// Threshold reached: pause for this long, then start counting again
    LongPause(Duration),
}

impl BreakerAdvice {
    pub fn duration(&self) -> Duration {
        match self {
            BreakerAdvice::Backoff(d) | BreakerAdvice::LongPause(d) => *d,
        }
    }
}

/// Consecutive failure counter with escalation
///
/// # Example
///
/// ```
/// use cadence_engine::{BreakerAdvice, CircuitBreaker};
/// use std::time::Duration;
///
/// let mut cb = CircuitBreaker::new(3, Duration::from_secs(10), Duration::from_secs(180));
///
/// assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(Duration::from_secs(10)));
/// assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(Duration::from_secs(10)));
/// assert_eq!(cb.record_failure(), BreakerAdvice::LongPause(Duration::from_secs(180)));
/// assert!(cb.at_threshold());
///
/// cb.reset();
/// assert_eq!(cb.failure_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    failure_count: u32,
    threshold: u32,
    short_pause: Duration,
    long_pause: Duration,
}

impl CircuitBreaker {
    /// Create a new breaker
    ///
    /// # Arguments
    ///
    /// * `threshold` - Consecutive failures that trigger the long pause
    /// * `short_pause` - Pause after a work failure below the threshold
    /// * `long_pause` - Pause once the threshold is reached
    pub fn new(threshold: u32, short_pause: Duration, long_pause: Duration) -> Self {
        Self {
            failure_count: 0,
            threshold: threshold.max(1),
            short_pause,
            long_pause,
        }
    }

    pub fn from_config(config: &BreakerConfig) -> Self {
        Self::new(config.threshold, config.short_pause(), config.long_pause())
    }

    /// Record a successful unit of work (resets failure count)
    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    /// Record a failed unit of work
    pub fn record_failure(&mut self) -> BreakerAdvice {
        self.increment();
        if self.at_threshold() {
            BreakerAdvice::LongPause(self.long_pause)
        } else {
            BreakerAdvice::Backoff(self.short_pause)
        }
    }

    /// Record an error that aborted a whole cycle
    ///
    /// At the threshold the count is reset immediately; the caller
    /// reschedules after the returned long pause.
    pub fn record_loop_error(&mut self, schedule: &ScheduleConfig) -> BreakerAdvice {
        self.increment();
        if self.at_threshold() {
            self.reset();
            BreakerAdvice::LongPause(self.long_pause)
        } else if self.failure_count > 1 {
            BreakerAdvice::Backoff(schedule.loop_error_repeat())
        } else {
            BreakerAdvice::Backoff(schedule.loop_error_first())
        }
    }

    pub fn reset(&mut self) {
        self.failure_count = 0;
    }

    pub fn at_threshold(&self) -> bool {
        self.failure_count >= self.threshold
    }

    /// Get current failure count (for display)
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn increment(&mut self) {
        self.failure_count = (self.failure_count + 1).min(self.threshold);
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_secs(10);
    const LONG: Duration = Duration::from_secs(180);

    #[test]
    fn test_work_failures_escalate() {
        let mut cb = CircuitBreaker::default();

        assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(SHORT));
        assert_eq!(cb.failure_count(), 1);
        assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(SHORT));
        assert_eq!(cb.record_failure(), BreakerAdvice::LongPause(LONG));
        assert!(cb.at_threshold());
    }

    #[test]
    fn test_threshold_counts_again_after_reset() {
        let mut cb = CircuitBreaker::default();
        for _ in 0..2 {
            cb.record_failure();
        }
        assert_eq!(cb.record_failure(), BreakerAdvice::LongPause(LONG));
        cb.reset();
        assert_eq!(cb.failure_count(), 0);

        assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(SHORT));
        assert_eq!(cb.failure_count(), 1);
        assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(SHORT));
        assert_eq!(cb.failure_count(), 2);
        assert_eq!(cb.record_failure(), BreakerAdvice::LongPause(LONG));
        cb.reset();
        assert_eq!(cb.failure_count(), 0);
    }

    #[test]
    fn test_success_resets() {
        let mut cb = CircuitBreaker::default();
        cb.record_failure();
        cb.record_failure();

        cb.record_success();
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(cb.record_failure(), BreakerAdvice::Backoff(SHORT));
    }

    #[test]
    fn test_count_never_exceeds_threshold() {
        let mut cb = CircuitBreaker::default();
        for _ in 0..10 {
            cb.record_failure();
            assert!(cb.failure_count() <= cb.threshold());
        }
        assert_eq!(cb.failure_count(), 3);
    }

    #[test]
    fn test_loop_error_ladder() {
        let mut cb = CircuitBreaker::default();
        let schedule = ScheduleConfig::default();

        assert_eq!(
            cb.record_loop_error(&schedule),
            BreakerAdvice::Backoff(Duration::from_secs(5))
        );
        assert_eq!(
            cb.record_loop_error(&schedule),
            BreakerAdvice::Backoff(Duration::from_secs(15))
        );
        assert_eq!(cb.record_loop_error(&schedule), BreakerAdvice::LongPause(LONG));
        assert_eq!(cb.failure_count(), 0);

        // Ladder starts over after the long pause
        assert_eq!(
            cb.record_loop_error(&schedule),
            BreakerAdvice::Backoff(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_ladders_share_the_counter() {
        let mut cb = CircuitBreaker::default();
        let schedule = ScheduleConfig::default();

        cb.record_failure();
        // Second consecutive failure overall, so the repeat delay applies
        assert_eq!(
            cb.record_loop_error(&schedule),
            BreakerAdvice::Backoff(Duration::from_secs(15))
        );
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let mut cb = CircuitBreaker::new(0, SHORT, LONG);
        assert_eq!(cb.threshold(), 1);
        assert_eq!(cb.record_failure(), BreakerAdvice::LongPause(LONG));
    }
}
