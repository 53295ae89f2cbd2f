//! Virtual time for the emulated devices.

use std::ops::Add;
use std::time::Duration;

use alert_core::time::MonotonicInstant;

/// Microseconds since the session started. Only advances when told to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct VirtualInstant(u64);

impl VirtualInstant {
    pub const ZERO: Self = Self(0);

    pub fn as_duration(self) -> Duration {
        Duration::from_micros(self.0)
    }
}

impl MonotonicInstant for VirtualInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for VirtualInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}
