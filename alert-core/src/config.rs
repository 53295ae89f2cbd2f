//! Startup configuration for the wrist device.

use core::fmt;

use crate::orchestrator::CountdownConfig;
use crate::signal::SignalConfig;

/// Field rejected by a configuration `validate()` call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    SampleRate,
    WindowSize,
    Threshold,
    ActivationRatio,
    SustainedDuration,
    CountdownTooShort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SampleRate => f.write_str("sample rate must be non-zero"),
            Self::WindowSize => f.write_str("window size out of range"),
            Self::Threshold => f.write_str("threshold must be a positive number"),
            Self::ActivationRatio => f.write_str("activation ratio must be in (0, 1]"),
            Self::SustainedDuration => f.write_str("sustained duration must be non-zero"),
            Self::CountdownTooShort => f.write_str("countdown must last at least one second"),
        }
    }
}

/// Every tunable the wrist needs, validated together at startup.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct WristConfig {
    pub signal: SignalConfig,
    pub countdown: CountdownConfig,
}

impl WristConfig {
    pub const DEFAULT: Self = Self {
        signal: SignalConfig::DEFAULT,
        countdown: CountdownConfig::DEFAULT,
    };

    /// Validates both sections, reporting the first rejected field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signal.validate()?;
        self.countdown.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn defaults_validate() {
        assert_eq!(WristConfig::DEFAULT.validate(), Ok(()));
    }

    #[test]
    fn countdown_section_is_checked() {
        let mut config = WristConfig::DEFAULT;
        config.countdown.duration = Duration::from_millis(500);
        assert_eq!(config.validate(), Err(ConfigError::CountdownTooShort));
    }
}
