//! Sustained abnormal-motion detection.
//!
//! [`SignalProcessor`] folds 3-axis accelerometer samples into a sliding
//! window of user-acceleration magnitudes (the Euclidean norm with the 1 g
//! gravity baseline removed). Once the window is full, every sample yields a
//! high-energy ratio; a streak of ticks at or above the activation ratio that
//! lasts for the sustained duration fires the trigger once. A single low tick
//! closes the streak.
//!
//! The processor is single-writer: samples must be ingested in arrival order
//! from one execution context.

mod window;

pub use window::{MAX_WINDOW_SAMPLES, MagnitudeWindow};

use core::time::Duration;

use crate::config::ConfigError;
use crate::error::AlertError;
use crate::time::MonotonicInstant;

/// Gravity baseline reported by an accelerometer at rest, in g.
pub const GRAVITY_G: f64 = 1.0;

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 50;
pub const DEFAULT_WINDOW_SIZE: usize = 250;
pub const DEFAULT_THRESHOLD_G: f64 = 2.0;
pub const DEFAULT_ACTIVATION_RATIO: f64 = 0.6;
pub const DEFAULT_SUSTAINED_DURATION: Duration = Duration::from_secs(5);

/// Detection tunables, validated at startup.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SignalConfig {
    pub sample_rate_hz: u32,
    pub window_size: usize,
    pub threshold_g: f64,
    pub activation_ratio: f64,
    pub sustained: Duration,
}

impl SignalConfig {
    pub const DEFAULT: Self = Self::new(
        DEFAULT_SAMPLE_RATE_HZ,
        DEFAULT_WINDOW_SIZE,
        DEFAULT_THRESHOLD_G,
        DEFAULT_ACTIVATION_RATIO,
        DEFAULT_SUSTAINED_DURATION,
    );

    #[must_use]
    pub const fn new(
        sample_rate_hz: u32,
        window_size: usize,
        threshold_g: f64,
        activation_ratio: f64,
        sustained: Duration,
    ) -> Self {
        Self {
            sample_rate_hz,
            window_size,
            threshold_g,
            activation_ratio,
            sustained,
        }
    }

    /// Interval between consecutive samples at the configured rate.
    pub fn sample_period(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(1_000_000 / u64::from(self.sample_rate_hz))
    }

    /// Time covered by a full window.
    pub fn window_duration(&self) -> Duration {
        let samples = u32::try_from(self.window_size).unwrap_or(u32::MAX);
        self.sample_period().saturating_mul(samples)
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::SampleRate);
        }
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SAMPLES {
            return Err(ConfigError::WindowSize);
        }
        if !self.threshold_g.is_finite() || self.threshold_g <= 0.0 {
            return Err(ConfigError::Threshold);
        }
        if !(self.activation_ratio > 0.0 && self.activation_ratio <= 1.0) {
            return Err(ConfigError::ActivationRatio);
        }
        if self.sustained.is_zero() {
            return Err(ConfigError::SustainedDuration);
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One accelerometer reading in g units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sample<I> {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: I,
}

impl<I> Sample<I> {
    pub const fn new(x: f64, y: f64, z: f64, timestamp: I) -> Self {
        Self { x, y, z, timestamp }
    }

    /// Euclidean norm of the raw vector.
    pub fn magnitude(&self) -> f64 {
        libm::sqrt(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    /// Magnitude with the gravity baseline removed.
    pub fn user_magnitude(&self) -> f64 {
        libm::fabs(self.magnitude() - GRAVITY_G)
    }
}

/// Reports whether the motion sensor can deliver samples.
pub trait SensorCapability {
    fn is_available(&self) -> bool;
}

impl SensorCapability for bool {
    fn is_available(&self) -> bool {
        *self
    }
}

/// Result of a successful [`SignalProcessor::start`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StartOutcome {
    Started,
    /// The processor was already running; nothing changed.
    AlreadyRunning,
}

/// Result of folding one sample into the window.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SignalUpdate {
    /// User-acceleration magnitude of the sample, published for display.
    pub magnitude: f64,
    /// High-energy ratio, present once the window is full.
    pub ratio: Option<f64>,
    /// `true` on the single sample that fires the trigger.
    pub triggered: bool,
}

/// Sliding-window detector for sustained high-energy motion.
#[derive(Clone, Debug)]
pub struct SignalProcessor<I> {
    config: SignalConfig,
    window: MagnitudeWindow,
    running: bool,
    episode_started: Option<I>,
    fired: bool,
    magnitude: f64,
}

impl<I> SignalProcessor<I>
where
    I: MonotonicInstant,
{
    #[must_use]
    pub fn new(config: SignalConfig) -> Self {
        Self {
            window: MagnitudeWindow::new(config.window_size, config.threshold_g),
            config,
            running: false,
            episode_started: None,
            fired: false,
            magnitude: 0.0,
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Latest published user-acceleration magnitude.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn window(&self) -> &MagnitudeWindow {
        &self.window
    }

    /// Start of the open high-energy interval, if one is open.
    pub fn episode_started(&self) -> Option<I> {
        self.episode_started
    }

    /// Returns `true` once the trigger fired and until [`reset`](Self::reset).
    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Begins accepting samples.
    pub fn start<C>(&mut self, sensor: &C) -> Result<StartOutcome, AlertError>
    where
        C: SensorCapability + ?Sized,
    {
        if self.running {
            return Ok(StartOutcome::AlreadyRunning);
        }
        if !sensor.is_available() {
            return Err(AlertError::SensorUnavailable);
        }

        self.running = true;
        Ok(StartOutcome::Started)
    }

    /// Stops accepting samples and discards all window and trigger state.
    pub fn stop(&mut self) {
        self.running = false;
        self.window.clear();
        self.episode_started = None;
        self.fired = false;
        self.magnitude = 0.0;
    }

    /// Clears trigger state after an alert while keeping the sample stream.
    pub fn reset(&mut self) {
        self.window.clear();
        self.episode_started = None;
        self.fired = false;
    }

    /// Folds `sample` into the window.
    ///
    /// Returns `None` while the processor is stopped.
    pub fn ingest(&mut self, sample: &Sample<I>) -> Option<SignalUpdate> {
        if !self.running {
            return None;
        }

        let magnitude = sample.user_magnitude();
        self.magnitude = magnitude;
        self.window.push(magnitude);

        let ratio = self.window.ratio();
        let triggered = match ratio {
            Some(value) if value >= self.config.activation_ratio => {
                self.high_energy_tick(sample.timestamp)
            }
            Some(_) => {
                self.episode_started = None;
                false
            }
            None => false,
        };

        Some(SignalUpdate {
            magnitude,
            ratio,
            triggered,
        })
    }

    fn high_energy_tick(&mut self, now: I) -> bool {
        let started = *self.episode_started.get_or_insert(now);
        if self.fired || now.saturating_duration_since(started) < self.config.sustained {
            return false;
        }

        self.fired = true;
        true
    }
}
