//! Alert lifecycle state machine.
//!
//! The orchestrator turns a detection trigger into at most one dispatched
//! [`AlertEvent`]. It never owns the signal processor or the transport:
//! every call returns an [`OrchestratorUpdate`] describing the detector
//! command to apply, the event to hand to the delivery channel, and the
//! notices a UI or log should surface. Callers serialize access (one task or
//! one `&mut` borrow), which makes each transition atomic: a cancel that is
//! processed first leaves no countdown for a later poll to expire, and an
//! expiry that is processed first makes the later cancel fail.

mod countdown;

pub use countdown::{
    Countdown, CountdownConfig, CountdownTick, DEFAULT_CANCEL_COOLDOWN, DEFAULT_COUNTDOWN,
    DEFAULT_SEND_COOLDOWN,
};

use core::{fmt, ops::Add, time::Duration};

use heapless::Vec;

use crate::contact::ContactRegistry;
use crate::delivery::{DeliveryReceipt, DeliveryRoute};
use crate::error::AlertError;
use crate::signal::SensorCapability;
use crate::time::MonotonicInstant;
use crate::wire::{AlertEvent, GeoPoint};

/// Maximum notices attached to one update.
pub const MAX_NOTICES: usize = 6;

/// Lifecycle phases.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertState {
    /// No sample subscription.
    Idle,
    /// Detector running, waiting for a trigger.
    Monitoring,
    /// Transient: checking the contact after a trigger.
    Triggered,
    /// Cancellable countdown in progress.
    Countdown,
    /// Alert handed to the delivery channel.
    Sending,
    /// Countdown cancelled by the wearer.
    Cancelled,
}

impl AlertState {
    /// Returns `true` while the detector should be consuming samples.
    pub const fn is_monitoring(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Returns `true` while an episode is being handled.
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Triggered | Self::Countdown | Self::Sending)
    }

    /// Compact code used by lock-free status publishers.
    pub const fn code(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Monitoring => 1,
            Self::Triggered => 2,
            Self::Countdown => 3,
            Self::Sending => 4,
            Self::Cancelled => 5,
        }
    }

    /// Decodes a [`code`](Self::code); unknown values map to `Idle`.
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Monitoring,
            2 => Self::Triggered,
            3 => Self::Countdown,
            4 => Self::Sending,
            5 => Self::Cancelled,
            _ => Self::Idle,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Monitoring => "monitoring",
            Self::Triggered => "triggered",
            Self::Countdown => "countdown",
            Self::Sending => "sending",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Instruction for the context that owns the signal processor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectorCommand {
    Start,
    Stop,
    /// Clear trigger state but keep consuming samples.
    Reset,
}

/// Observable outcome of a transition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AlertNotice {
    StateChanged { from: AlertState, to: AlertState },
    CountdownStarted { seconds: u64 },
    /// A whole-second boundary was crossed; drives haptic feedback.
    CountdownTick { seconds_left: u64, crossed: u64 },
    /// A trigger fired but there is nobody to alert. Prompt for a contact.
    NoValidContact,
    /// The alert was built without a location fix.
    LocationUnavailable,
    TriggerIgnored(AlertState),
    DeliverySucceeded(DeliveryRoute),
    DeliveryFailed {
        error: AlertError,
        retry_available: bool,
    },
}

/// Everything a caller must act on after one orchestrator call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrchestratorUpdate {
    pub notices: Vec<AlertNotice, MAX_NOTICES>,
    pub detector: Option<DetectorCommand>,
    pub dispatch: Option<AlertEvent>,
}

impl OrchestratorUpdate {
    fn notify(&mut self, notice: AlertNotice) {
        // Sized so that no single transition overflows.
        let _ = self.notices.push(notice);
    }

    /// Returns `true` when the update carries a notice equal to `notice`.
    pub fn contains(&self, notice: &AlertNotice) -> bool {
        self.notices.iter().any(|candidate| candidate == notice)
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty() && self.detector.is_none() && self.dispatch.is_none()
    }
}

/// Inputs read when an alert is materialized.
#[derive(Copy, Clone, Debug)]
pub struct AlertSources<'a> {
    pub contacts: &'a ContactRegistry,
    pub location: Option<GeoPoint>,
    /// Seconds since the Unix epoch.
    pub unix_time: f64,
}

/// Failure reported when attempting an invalid state transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransitionError {
    pub from: AlertState,
    pub to: AlertState,
}

impl TransitionError {
    pub const fn new(from: AlertState, to: AlertState) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move from {} to {}", self.from, self.to)
    }
}

/// Reasons an on-demand send was refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequestError {
    /// An episode or delivery is already in progress.
    Busy(AlertState),
    /// No failed delivery is waiting for a retry.
    NothingToRetry,
    Alert(AlertError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy(state) => write!(f, "busy ({state})"),
            Self::NothingToRetry => f.write_str("no failed alert to retry"),
            Self::Alert(error) => write!(f, "{error}"),
        }
    }
}

/// Drives detect, countdown, and send for one wrist.
#[derive(Clone, Debug)]
pub struct AlertOrchestrator<I> {
    config: CountdownConfig,
    state: AlertState,
    countdown: Option<Countdown<I>>,
    resume_at: Option<I>,
    in_flight: Option<AlertEvent>,
    failed: Option<AlertEvent>,
    contact_missing: bool,
}

impl<I> AlertOrchestrator<I>
where
    I: MonotonicInstant + Add<Duration, Output = I>,
{
    #[must_use]
    pub const fn new(config: CountdownConfig) -> Self {
        Self {
            config,
            state: AlertState::Idle,
            countdown: None,
            resume_at: None,
            in_flight: None,
            failed: None,
            contact_missing: false,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn config(&self) -> &CountdownConfig {
        &self.config
    }

    /// Remaining countdown time at `now`, when a countdown is active.
    pub fn countdown_remaining(&self, now: I) -> Option<Duration> {
        self.countdown.map(|countdown| countdown.remaining(now))
    }

    /// Returns `true` when the last trigger found no valid contact.
    pub fn contact_missing(&self) -> bool {
        self.contact_missing
    }

    /// Returns `true` while a failed alert can be retried.
    pub fn has_failed_delivery(&self) -> bool {
        self.failed.is_some()
    }

    /// Returns `true` while a dispatched alert awaits its receipt.
    pub fn has_delivery_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Leaves `Idle` and asks for the detector to start.
    ///
    /// Calling this while already monitoring is a no-op.
    pub fn begin_monitoring<C>(&mut self, sensor: &C) -> Result<OrchestratorUpdate, AlertError>
    where
        C: SensorCapability + ?Sized,
    {
        let mut update = OrchestratorUpdate::default();
        if self.state != AlertState::Idle {
            return Ok(update);
        }
        if !sensor.is_available() {
            return Err(AlertError::SensorUnavailable);
        }

        self.transition(AlertState::Monitoring, &mut update);
        update.detector = Some(DetectorCommand::Start);
        Ok(update)
    }

    /// Returns to `Idle`, abandoning any countdown.
    pub fn stop(&mut self) -> OrchestratorUpdate {
        let mut update = OrchestratorUpdate::default();
        if self.state == AlertState::Idle {
            return update;
        }

        self.countdown = None;
        self.resume_at = None;
        self.transition(AlertState::Idle, &mut update);
        update.detector = Some(DetectorCommand::Stop);
        update
    }

    /// Handles a detector trigger raised at `now`.
    pub fn on_trigger(&mut self, now: I, contacts: &ContactRegistry) -> OrchestratorUpdate {
        let mut update = OrchestratorUpdate::default();
        if self.state != AlertState::Monitoring {
            update.notify(AlertNotice::TriggerIgnored(self.state));
            return update;
        }

        self.transition(AlertState::Triggered, &mut update);

        if !contacts.has_valid_contact() {
            self.contact_missing = true;
            update.notify(AlertNotice::NoValidContact);
            update.detector = Some(DetectorCommand::Reset);
            self.transition(AlertState::Monitoring, &mut update);
            return update;
        }

        self.contact_missing = false;
        self.countdown = Some(Countdown::new(now, self.config.duration));
        self.transition(AlertState::Countdown, &mut update);
        update.notify(AlertNotice::CountdownStarted {
            seconds: self.config.duration.as_secs(),
        });
        update
    }

    /// Cancels the active countdown. No alert is built.
    pub fn cancel(&mut self, now: I) -> Result<OrchestratorUpdate, TransitionError> {
        if self.state != AlertState::Countdown {
            return Err(TransitionError::new(self.state, AlertState::Cancelled));
        }

        let mut update = OrchestratorUpdate::default();
        self.countdown = None;
        self.resume_at = Some(now + self.config.cancel_cooldown);
        self.transition(AlertState::Cancelled, &mut update);
        Ok(update)
    }

    /// Periodic evaluation: countdown ticks, expiry, and cooldown resumption.
    pub fn poll(&mut self, now: I, sources: &AlertSources<'_>) -> OrchestratorUpdate {
        let mut update = OrchestratorUpdate::default();
        match self.state {
            AlertState::Countdown => {
                let Some(countdown) = self.countdown.as_mut() else {
                    return update;
                };

                let tick = countdown.evaluate(now);
                if let Some(seconds_left) = tick.boundary {
                    update.notify(AlertNotice::CountdownTick {
                        seconds_left,
                        crossed: tick.crossed,
                    });
                }
                if tick.expired {
                    self.expire(now, sources, &mut update);
                }
            }
            AlertState::Sending | AlertState::Cancelled => {
                if self.resume_at.is_some_and(|deadline| now >= deadline) {
                    self.resume_at = None;
                    update.detector = Some(DetectorCommand::Reset);
                    self.transition(AlertState::Monitoring, &mut update);
                }
            }
            AlertState::Idle | AlertState::Monitoring | AlertState::Triggered => {}
        }
        update
    }

    /// Records the receipt for the most recently dispatched alert.
    pub fn delivery_finished(&mut self, receipt: &DeliveryReceipt, now: I) -> OrchestratorUpdate {
        let mut update = OrchestratorUpdate::default();
        let event = self.in_flight.take();

        match (receipt.route, receipt.error) {
            (Some(route), None) => {
                self.failed = None;
                update.notify(AlertNotice::DeliverySucceeded(route));
            }
            (_, error) => {
                let error = error.unwrap_or(AlertError::TransportFailure);
                let retry_available = event.is_some() && error.is_retryable();
                self.failed = if retry_available { event } else { None };
                update.notify(AlertNotice::DeliveryFailed {
                    error,
                    retry_available,
                });
            }
        }

        if self.state == AlertState::Sending {
            self.resume_at = Some(now + self.config.send_cooldown);
        }
        update
    }

    /// Hands back the last failed alert for another delivery attempt.
    pub fn retry_failed(&mut self) -> Result<AlertEvent, RequestError> {
        self.ensure_quiet()?;
        let event = self.failed.take().ok_or(RequestError::NothingToRetry)?;
        self.in_flight = Some(event.clone());
        Ok(event)
    }

    /// Builds an alert on demand without running a countdown.
    pub fn test_alert(&mut self, sources: &AlertSources<'_>) -> Result<AlertEvent, RequestError> {
        self.ensure_quiet()?;
        let event = build_event(sources).map_err(RequestError::Alert)?;
        self.in_flight = Some(event.clone());
        Ok(event)
    }

    fn ensure_quiet(&self) -> Result<(), RequestError> {
        if self.state.is_busy() || self.in_flight.is_some() {
            return Err(RequestError::Busy(self.state));
        }
        Ok(())
    }

    fn expire(&mut self, now: I, sources: &AlertSources<'_>, update: &mut OrchestratorUpdate) {
        self.countdown = None;
        self.transition(AlertState::Sending, update);

        match build_event(sources) {
            Ok(event) => {
                if sources.location.is_none() {
                    update.notify(AlertNotice::LocationUnavailable);
                }
                self.in_flight = Some(event.clone());
                update.dispatch = Some(event);
            }
            Err(AlertError::NoValidContact) => {
                self.contact_missing = true;
                update.notify(AlertNotice::NoValidContact);
                self.resume_at = Some(now);
            }
            Err(error) => {
                update.notify(AlertNotice::DeliveryFailed {
                    error,
                    retry_available: false,
                });
                self.resume_at = Some(now + self.config.send_cooldown);
            }
        }
    }

    fn transition(&mut self, to: AlertState, update: &mut OrchestratorUpdate) {
        let from = self.state;
        if from != to {
            self.state = to;
            update.notify(AlertNotice::StateChanged { from, to });
        }
    }
}

impl<I> Default for AlertOrchestrator<I>
where
    I: MonotonicInstant + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new(CountdownConfig::DEFAULT)
    }
}

fn build_event(sources: &AlertSources<'_>) -> Result<AlertEvent, AlertError> {
    let contact = sources
        .contacts
        .valid_contact()
        .ok_or(AlertError::NoValidContact)?;

    AlertEvent::new(
        sources.unix_time,
        sources.location.unwrap_or(GeoPoint::ORIGIN),
        contact.name(),
        contact.phone_number(),
        sources.contacts.wearer_name(),
    )
    .map_err(AlertError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::EmergencyContact;

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

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self {
            let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
            Self(self.0.saturating_add(micros))
        }
    }

    fn contacts() -> ContactRegistry {
        let mut registry = ContactRegistry::new();
        registry.set_contact(EmergencyContact::new("Ada", "5550100").expect("contact"));
        registry
    }

    fn monitoring() -> AlertOrchestrator<MockInstant> {
        let mut orchestrator = AlertOrchestrator::default();
        let update = orchestrator.begin_monitoring(&true).expect("sensor available");
        assert_eq!(update.detector, Some(DetectorCommand::Start));
        orchestrator
    }

    fn sources(contacts: &ContactRegistry) -> AlertSources<'_> {
        AlertSources {
            contacts,
            location: Some(GeoPoint::new(47.6205, -122.3493)),
            unix_time: 1_700_000_000.0,
        }
    }

    #[test]
    fn sensor_unavailable_keeps_idle() {
        let mut orchestrator = AlertOrchestrator::<MockInstant>::default();
        assert_eq!(
            orchestrator.begin_monitoring(&false),
            Err(AlertError::SensorUnavailable)
        );
        assert_eq!(orchestrator.state(), AlertState::Idle);
    }

    #[test]
    fn trigger_without_contact_returns_to_monitoring() {
        let mut orchestrator = monitoring();
        let registry = ContactRegistry::new();

        let update = orchestrator.on_trigger(MockInstant::millis(0), &registry);

        assert_eq!(orchestrator.state(), AlertState::Monitoring);
        assert!(update.contains(&AlertNotice::NoValidContact));
        assert_eq!(update.detector, Some(DetectorCommand::Reset));
        assert!(update.dispatch.is_none());
        assert!(orchestrator.contact_missing());
        assert!(orchestrator.countdown_remaining(MockInstant::millis(0)).is_none());
    }

    #[test]
    fn expiry_dispatches_exactly_one_event() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);
        assert_eq!(orchestrator.state(), AlertState::Countdown);

        let mut dispatched = 0;
        let mut ticks = 0;
        for step in 1..=120 {
            let update = orchestrator.poll(MockInstant::millis(step * 100), &sources(&registry));
            if update.dispatch.is_some() {
                dispatched += 1;
            }
            ticks += update
                .notices
                .iter()
                .filter(|notice| matches!(notice, AlertNotice::CountdownTick { .. }))
                .count();
        }

        assert_eq!(dispatched, 1);
        assert_eq!(ticks, 9);
        assert_eq!(orchestrator.state(), AlertState::Sending);
        assert!(orchestrator.has_delivery_in_flight());
    }

    #[test]
    fn cancel_before_expiry_prevents_dispatch() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);

        orchestrator
            .cancel(MockInstant::millis(9_999))
            .expect("cancel during countdown");
        assert_eq!(orchestrator.state(), AlertState::Cancelled);

        let late = orchestrator.poll(MockInstant::millis(10_001), &sources(&registry));
        assert!(late.dispatch.is_none());

        let resumed = orchestrator.poll(MockInstant::millis(11_000), &sources(&registry));
        assert_eq!(orchestrator.state(), AlertState::Monitoring);
        assert_eq!(resumed.detector, Some(DetectorCommand::Reset));
    }

    #[test]
    fn expiry_before_cancel_rejects_cancel() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);

        let update = orchestrator.poll(MockInstant::millis(10_000), &sources(&registry));
        assert!(update.dispatch.is_some());

        let cancel = orchestrator.cancel(MockInstant::millis(10_000));
        assert_eq!(
            cancel,
            Err(TransitionError::new(AlertState::Sending, AlertState::Cancelled))
        );
    }

    #[test]
    fn second_trigger_during_countdown_is_ignored() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);

        let update = orchestrator.on_trigger(MockInstant::millis(500), &registry);
        assert!(update.contains(&AlertNotice::TriggerIgnored(AlertState::Countdown)));
        assert_eq!(
            orchestrator.countdown_remaining(MockInstant::millis(500)),
            Some(Duration::from_millis(9_500))
        );
    }

    #[test]
    fn failed_delivery_offers_retry_and_still_resumes() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);
        let update = orchestrator.poll(MockInstant::millis(10_000), &sources(&registry));
        let event = update.dispatch.expect("dispatch");

        let receipt = DeliveryReceipt::failed(AlertError::TransportFailure);
        let update = orchestrator.delivery_finished(&receipt, MockInstant::millis(10_500));
        assert!(update.contains(&AlertNotice::DeliveryFailed {
            error: AlertError::TransportFailure,
            retry_available: true,
        }));

        orchestrator.poll(MockInstant::millis(12_000), &sources(&registry));
        assert_eq!(orchestrator.state(), AlertState::Sending);
        orchestrator.poll(MockInstant::millis(12_500), &sources(&registry));
        assert_eq!(orchestrator.state(), AlertState::Monitoring);

        let retried = orchestrator.retry_failed().expect("retry available");
        assert_eq!(retried, event);
        assert_eq!(
            orchestrator.retry_failed(),
            Err(RequestError::Busy(AlertState::Monitoring))
        );
    }

    #[test]
    fn successful_delivery_clears_retry() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        let event = orchestrator
            .test_alert(&sources(&registry))
            .expect("test alert");
        assert_eq!(event.contact_phone(), "5550100");
        assert_eq!(event.wearer_name(), "the wearer");

        let receipt = DeliveryReceipt::delivered(DeliveryRoute::Direct);
        let update = orchestrator.delivery_finished(&receipt, MockInstant::millis(0));
        assert!(update.contains(&AlertNotice::DeliverySucceeded(DeliveryRoute::Direct)));
        assert_eq!(orchestrator.retry_failed(), Err(RequestError::NothingToRetry));
        assert_eq!(orchestrator.state(), AlertState::Monitoring);
    }

    #[test]
    fn missing_location_is_reported_and_zeroed() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);

        let mut no_fix = sources(&registry);
        no_fix.location = None;
        let update = orchestrator.poll(MockInstant::millis(10_000), &no_fix);

        assert!(update.contains(&AlertNotice::LocationUnavailable));
        let event = update.dispatch.expect("dispatch");
        assert_eq!(event.location(), GeoPoint::ORIGIN);
    }

    #[test]
    fn contact_removed_during_countdown_sends_nothing() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);

        let cleared = ContactRegistry::new();
        let update = orchestrator.poll(MockInstant::millis(10_000), &sources(&cleared));
        assert!(update.dispatch.is_none());
        assert!(update.contains(&AlertNotice::NoValidContact));

        orchestrator.poll(MockInstant::millis(10_000), &sources(&cleared));
        assert_eq!(orchestrator.state(), AlertState::Monitoring);
    }

    #[test]
    fn stop_abandons_countdown() {
        let mut orchestrator = monitoring();
        let registry = contacts();
        orchestrator.on_trigger(MockInstant::millis(0), &registry);

        let update = orchestrator.stop();
        assert_eq!(update.detector, Some(DetectorCommand::Stop));
        assert_eq!(orchestrator.state(), AlertState::Idle);

        let late = orchestrator.poll(MockInstant::millis(20_000), &sources(&registry));
        assert!(late.is_empty());
    }

    #[test]
    fn state_codes_round_trip() {
        for state in [
            AlertState::Idle,
            AlertState::Monitoring,
            AlertState::Triggered,
            AlertState::Countdown,
            AlertState::Sending,
            AlertState::Cancelled,
        ] {
            assert_eq!(AlertState::from_code(state.code()), state);
        }
    }
}
