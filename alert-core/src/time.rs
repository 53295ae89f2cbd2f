//! Time abstractions shared by firmware, emulator, and tests.

use core::time::Duration;

/// Monotonic instant supplied by the platform.
///
/// Firmware wraps the Embassy timer, the emulator advances a virtual clock,
/// and tests use plain microsecond counters. Every timing decision in the
/// crate goes through this trait so nothing depends on a real clock.
pub trait MonotonicInstant: Copy + Ord {
    /// Returns the elapsed time since `earlier`, or zero when `earlier` is later.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Wall clock derived from the last time sync received from the companion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClockSync<I> {
    anchor: Option<(I, f64)>,
}

impl<I> ClockSync<I>
where
    I: MonotonicInstant,
{
    /// Creates a clock that has not been synchronized yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { anchor: None }
    }

    /// Records that `unix_seconds` was the wall time at `now`.
    pub fn record(&mut self, now: I, unix_seconds: f64) {
        if unix_seconds.is_finite() && unix_seconds >= 0.0 {
            self.anchor = Some((now, unix_seconds));
        }
    }

    /// Returns `true` once at least one sync has been recorded.
    pub fn is_synced(&self) -> bool {
        self.anchor.is_some()
    }

    /// Seconds since the Unix epoch at `now`; `0.0` before the first sync.
    pub fn unix_seconds(&self, now: I) -> f64 {
        match self.anchor {
            Some((at, base)) => base + now.saturating_duration_since(at).as_secs_f64(),
            None => 0.0,
        }
    }
}

impl<I> Default for ClockSync<I>
where
    I: MonotonicInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    struct MockInstant(u64);

    impl MonotonicInstant for MockInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    #[test]
    fn unsynced_clock_reports_epoch() {
        let clock = ClockSync::<MockInstant>::new();
        assert!(!clock.is_synced());
        assert!(libm::fabs(clock.unix_seconds(MockInstant(5_000_000))) < f64::EPSILON);
    }

    #[test]
    fn synced_clock_advances_with_monotonic_time() {
        let mut clock = ClockSync::new();
        clock.record(MockInstant(1_000_000), 1_700_000_000.0);

        let later = clock.unix_seconds(MockInstant(3_500_000));
        assert!(libm::fabs(later - 1_700_000_002.5) < 1e-6);
    }

    #[test]
    fn negative_sync_values_are_ignored() {
        let mut clock = ClockSync::new();
        clock.record(MockInstant(0), -1.0);
        assert!(!clock.is_synced());
    }
}
