use core::time::Duration;

use alert_core::signal::{Sample, SignalConfig, SignalProcessor, StartOutcome};
use alert_core::time::MonotonicInstant;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct MockInstant(u64);

impl MonotonicInstant for MockInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

const PERIOD_US: u64 = 20_000;

struct Feed {
    processor: SignalProcessor<MockInstant>,
    tick: u64,
}

impl Feed {
    fn new(config: SignalConfig) -> Self {
        let mut processor = SignalProcessor::new(config);
        assert_eq!(processor.start(&true), Ok(StartOutcome::Started));
        Self { processor, tick: 0 }
    }

    /// Feeds `count` samples of the raw vector `(0, 0, z)` and returns the trigger count.
    fn feed(&mut self, z: f64, count: usize) -> usize {
        let mut triggers = 0;
        for _ in 0..count {
            let sample = Sample::new(0.0, 0.0, z, MockInstant(self.tick * PERIOD_US));
            self.tick += 1;
            let update = self.processor.ingest(&sample).expect("processor running");
            if update.triggered {
                triggers += 1;
            }
        }
        triggers
    }
}

#[test]
fn resting_wrist_never_triggers() {
    let mut feed = Feed::new(SignalConfig::DEFAULT);
    // Ten minutes at 1 g with slight sensor noise on the other axes.
    let mut triggers = 0;
    for step in 0..30_000u64 {
        let wobble = if step % 2 == 0 { 0.01 } else { -0.01 };
        let sample = Sample::new(wobble, -wobble, 1.0, MockInstant(step * PERIOD_US));
        if feed.processor.ingest(&sample).is_some_and(|update| update.triggered) {
            triggers += 1;
        }
    }

    assert_eq!(triggers, 0);
    assert!(feed.processor.episode_started().is_none());
    assert!(feed.processor.magnitude() < 0.01);
}

#[test]
fn sustained_shaking_triggers_exactly_once() {
    let mut feed = Feed::new(SignalConfig::DEFAULT);

    // The window fills after 250 samples; the episode then has to hold 5 s.
    assert_eq!(feed.feed(4.0, 499), 0);
    assert_eq!(feed.feed(4.0, 1), 1);
    assert_eq!(feed.feed(4.0, 1_000), 0);
    assert!(feed.processor.has_fired());

    feed.processor.reset();
    assert!(!feed.processor.has_fired());
    assert_eq!(feed.feed(4.0, 500), 1);
}

#[test]
fn magnitude_is_published_before_window_fills() {
    let mut feed = Feed::new(SignalConfig::DEFAULT);
    feed.feed(4.0, 1);

    assert!((feed.processor.magnitude() - 3.0).abs() < 1e-9);
    assert_eq!(feed.processor.window().ratio(), None);
}

#[test]
fn single_low_tick_breaks_the_episode() {
    let config = SignalConfig::new(50, 1, 2.0, 0.6, Duration::from_secs(1));
    let mut feed = Feed::new(config);

    // 0.9 s high, one low tick, 0.9 s high: neither stretch is long enough.
    assert_eq!(feed.feed(4.0, 45), 0);
    assert_eq!(feed.feed(1.0, 1), 0);
    assert!(feed.processor.episode_started().is_none());
    assert_eq!(feed.feed(4.0, 45), 0);

    // Holding past the sustain duration fires.
    assert_eq!(feed.feed(4.0, 10), 1);
}

#[test]
fn stop_discards_window_and_episode() {
    let mut feed = Feed::new(SignalConfig::DEFAULT);
    feed.feed(4.0, 300);
    assert!(feed.processor.episode_started().is_some());

    feed.processor.stop();
    assert!(feed.processor.window().is_empty());
    assert!(feed.processor.episode_started().is_none());

    let idle = Sample::new(0.0, 0.0, 4.0, MockInstant(0));
    assert!(feed.processor.ingest(&idle).is_none());

    assert_eq!(feed.processor.start(&true), Ok(StartOutcome::Started));
    assert_eq!(feed.processor.start(&true), Ok(StartOutcome::AlreadyRunning));
}

#[test]
fn unavailable_sensor_refuses_start() {
    let mut processor = SignalProcessor::<MockInstant>::new(SignalConfig::DEFAULT);
    assert_eq!(
        processor.start(&false),
        Err(alert_core::AlertError::SensorUnavailable)
    );
    assert!(!processor.is_running());
}
