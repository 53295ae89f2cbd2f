//! Pure cancellable countdown.
//!
//! Remaining time is always derived from the elapsed time since the countdown
//! started, never from accumulated tick deltas, so evaluating the same `now`
//! twice is harmless and scheduling jitter cannot cause drift.

use core::time::Duration;

use crate::config::ConfigError;
use crate::time::MonotonicInstant;

pub const DEFAULT_COUNTDOWN: Duration = Duration::from_secs(10);
pub const DEFAULT_SEND_COOLDOWN: Duration = Duration::from_secs(2);
pub const DEFAULT_CANCEL_COOLDOWN: Duration = Duration::from_secs(1);

/// Countdown length and the pauses before monitoring resumes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CountdownConfig {
    pub duration: Duration,
    pub send_cooldown: Duration,
    pub cancel_cooldown: Duration,
}

impl CountdownConfig {
    pub const DEFAULT: Self = Self::new(
        DEFAULT_COUNTDOWN,
        DEFAULT_SEND_COOLDOWN,
        DEFAULT_CANCEL_COOLDOWN,
    );

    #[must_use]
    pub const fn new(duration: Duration, send_cooldown: Duration, cancel_cooldown: Duration) -> Self {
        Self {
            duration,
            send_cooldown,
            cancel_cooldown,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration < Duration::from_secs(1) {
            return Err(ConfigError::CountdownTooShort);
        }
        Ok(())
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of evaluating the countdown at one instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CountdownTick {
    pub remaining: Duration,
    /// Whole seconds left (rounded up) when at least one boundary was crossed.
    pub boundary: Option<u64>,
    /// Number of second boundaries crossed since the previous evaluation.
    pub crossed: u64,
    pub expired: bool,
}

/// Countdown started at a fixed instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Countdown<I> {
    started_at: I,
    duration: Duration,
    last_whole_seconds: u64,
}

impl<I> Countdown<I>
where
    I: MonotonicInstant,
{
    #[must_use]
    pub fn new(started_at: I, duration: Duration) -> Self {
        Self {
            started_at,
            duration,
            last_whole_seconds: ceil_seconds(duration),
        }
    }

    pub fn started_at(&self) -> I {
        self.started_at
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left at `now`; zero once expired.
    pub fn remaining(&self, now: I) -> Duration {
        self.duration
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }

    /// Evaluates the countdown at `now`, reporting second boundaries crossed downward.
    ///
    /// The boundary at zero is reported through `expired` rather than `boundary`.
    pub fn evaluate(&mut self, now: I) -> CountdownTick {
        let remaining = self.remaining(now);
        let whole = ceil_seconds(remaining).max(1);

        let crossed = self.last_whole_seconds.saturating_sub(whole);
        let boundary = if crossed > 0 {
            self.last_whole_seconds = whole;
            Some(whole)
        } else {
            None
        };

        CountdownTick {
            remaining,
            boundary,
            crossed,
            expired: remaining.is_zero(),
        }
    }
}

fn ceil_seconds(duration: Duration) -> u64 {
    let whole = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    struct MockInstant(u64);

    impl MockInstant {
        fn millis(value: u64) -> Self {
            Self(value * 1_000)
        }
    }

    impl MonotonicInstant for MockInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn boundaries_fire_once_per_second() {
        let mut countdown = Countdown::new(MockInstant::millis(0), Duration::from_secs(3));

        let mut boundaries = heapless::Vec::<u64, 8>::new();
        let mut expired_at = None;
        for step in 1..=40 {
            let now = MockInstant::millis(step * 100);
            let tick = countdown.evaluate(now);
            if let Some(second) = tick.boundary {
                boundaries.push(second).expect("capacity");
            }
            if tick.expired && expired_at.is_none() {
                expired_at = Some(step * 100);
            }
        }

        assert_eq!(boundaries.as_slice(), &[2, 1]);
        assert_eq!(expired_at, Some(3_000));
    }

    #[test]
    fn repeated_evaluation_is_idempotent() {
        let mut countdown = Countdown::new(MockInstant::millis(0), Duration::from_secs(10));
        let now = MockInstant::millis(1_250);

        let first = countdown.evaluate(now);
        let second = countdown.evaluate(now);

        assert_eq!(first.remaining, Duration::from_millis(8_750));
        assert_eq!(first.boundary, Some(9));
        assert_eq!(second.remaining, first.remaining);
        assert_eq!(second.boundary, None);
    }

    #[test]
    fn jittered_schedules_agree_on_remaining_time() {
        let mut steady = Countdown::new(MockInstant::millis(0), Duration::from_secs(10));
        let mut jittery = Countdown::new(MockInstant::millis(0), Duration::from_secs(10));

        let mut steady_crossed = 0;
        for step in 1..=46 {
            steady_crossed += steady.evaluate(MockInstant::millis(step * 100)).crossed;
        }

        let mut jitter_crossed = 0;
        for millis in [37, 940, 950, 2_900, 3_010, 4_600] {
            jitter_crossed += jittery.evaluate(MockInstant::millis(millis)).crossed;
        }

        let at = MockInstant::millis(4_600);
        assert_eq!(steady.remaining(at), jittery.remaining(at));
        assert_eq!(steady.remaining(at), Duration::from_millis(5_400));
        assert_eq!(steady_crossed, jitter_crossed);
        assert_eq!(steady_crossed, 4);
    }

    #[test]
    fn skipped_boundaries_are_counted() {
        let mut countdown = Countdown::new(MockInstant::millis(0), Duration::from_secs(10));
        let tick = countdown.evaluate(MockInstant::millis(3_500));
        assert_eq!(tick.boundary, Some(7));
        assert_eq!(tick.crossed, 3);
    }

    #[test]
    fn late_evaluation_expires() {
        let mut countdown = Countdown::new(MockInstant::millis(0), Duration::from_secs(10));
        let tick = countdown.evaluate(MockInstant::millis(60_000));
        assert!(tick.expired);
        assert_eq!(tick.remaining, Duration::ZERO);
        assert_eq!(tick.boundary, Some(1));
        assert_eq!(tick.crossed, 9);
    }

    #[test]
    fn config_defaults() {
        let config = CountdownConfig::default();
        assert_eq!(config.duration, Duration::from_secs(10));
        assert_eq!(config.send_cooldown, Duration::from_secs(2));
        assert_eq!(config.cancel_cooldown, Duration::from_secs(1));
    }
}
