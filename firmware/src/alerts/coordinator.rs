use alert_core::AlertError;
use alert_core::config::WristConfig;
use alert_core::contact::ContactRegistry;
use alert_core::link::{LinkNotice, LinkStatus};
use alert_core::orchestrator::{
    AlertNotice, AlertOrchestrator, AlertSources, AlertState, DetectorCommand, OrchestratorUpdate,
    RequestError,
};
use alert_core::store::{KeyValueStore, MemoryStore, StoreError};
use alert_core::time::ClockSync;
use alert_core::wire::{AlertEvent, GeoPoint};
use heapless::Vec;

use super::{AlertInput, HapticPattern};
use crate::clock::FirmwareInstant;
use crate::status;

/// Haptic patterns emitted by a single input.
pub const MAX_HAPTICS: usize = 4;

/// RAM-backed settings store; contents do not survive a reset.
pub type WristStore = MemoryStore<2, 128>;

/// Work the alert task hands to the other tasks after one input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoordinatorActions {
    pub detector: Option<DetectorCommand>,
    pub dispatch: Option<AlertEvent>,
    pub haptics: Vec<HapticPattern, MAX_HAPTICS>,
}

impl CoordinatorActions {
    fn absorb(&mut self, update: OrchestratorUpdate) {
        if update.detector.is_some() {
            self.detector = update.detector;
        }
        if update.dispatch.is_some() {
            self.dispatch = update.dispatch;
        }
        for notice in &update.notices {
            log_notice(notice);
            if let Some(pattern) = haptic_for(notice) {
                let _ = self.haptics.push(pattern);
            }
        }
    }
}

/// Wrist-side owner of the alert state machine and the settings it reads.
pub struct AlertCoordinator<S> {
    orchestrator: AlertOrchestrator<FirmwareInstant>,
    contacts: ContactRegistry,
    clock: ClockSync<FirmwareInstant>,
    location: Option<GeoPoint>,
    link: LinkStatus,
    store: S,
    sensor_available: bool,
}

impl<S> AlertCoordinator<S>
where
    S: KeyValueStore,
{
    /// Restores contact settings from `store`.
    ///
    /// A corrupt record is discarded so the wrist still boots and prompts for
    /// a contact on the first trigger.
    pub fn new(config: &WristConfig, store: S, sensor_available: bool) -> Self {
        let contacts = ContactRegistry::load(&store).unwrap_or_else(|error| {
            log_store_error("load", error);
            ContactRegistry::new()
        });

        Self {
            orchestrator: AlertOrchestrator::new(config.countdown),
            contacts,
            clock: ClockSync::new(),
            location: None,
            link: LinkStatus::default(),
            store,
            sensor_available,
        }
    }

    pub fn state(&self) -> AlertState {
        self.orchestrator.state()
    }

    pub fn contacts(&self) -> &ContactRegistry {
        &self.contacts
    }

    pub fn link(&self) -> LinkStatus {
        self.link
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    /// Enters monitoring at boot.
    pub fn start(&mut self) -> CoordinatorActions {
        let mut actions = CoordinatorActions::default();
        match self.orchestrator.begin_monitoring(&self.sensor_available) {
            Ok(update) => actions.absorb(update),
            Err(error) => log_alert_error("start", error),
        }
        self.publish_state();
        actions
    }

    pub fn handle(&mut self, input: AlertInput, now: FirmwareInstant) -> CoordinatorActions {
        let mut actions = CoordinatorActions::default();
        match input {
            AlertInput::Trigger(at) => {
                actions.absorb(self.orchestrator.on_trigger(at, &self.contacts));
            }
            AlertInput::Button => self.on_button(now, &mut actions),
            AlertInput::TestAlert => {
                let sources = sources(&self.contacts, self.location, &self.clock, now);
                let result = self.orchestrator.test_alert(&sources);
                accept_request(result, &mut actions);
            }
            AlertInput::DeliveryFinished(receipt) => {
                status::record_receipt(&receipt);
                actions.absorb(self.orchestrator.delivery_finished(&receipt, now));
            }
            AlertInput::Link(notice) => self.on_link_notice(notice, now),
            AlertInput::Tick => {
                let sources = sources(&self.contacts, self.location, &self.clock, now);
                let update = self.orchestrator.poll(now, &sources);
                actions.absorb(update);
            }
        }
        self.publish_state();
        actions
    }

    fn on_button(&mut self, now: FirmwareInstant, actions: &mut CoordinatorActions) {
        match self.orchestrator.state() {
            AlertState::Countdown => match self.orchestrator.cancel(now) {
                Ok(update) => {
                    actions.absorb(update);
                    let _ = actions.haptics.push(HapticPattern::Cancelled);
                }
                Err(error) => log_transition_refused(error.from, error.to),
            },
            AlertState::Idle => match self.orchestrator.begin_monitoring(&self.sensor_available) {
                Ok(update) => actions.absorb(update),
                Err(error) => log_alert_error("start", error),
            },
            _ if self.orchestrator.has_failed_delivery() => {
                let result = self.orchestrator.retry_failed();
                accept_request(result, actions);
            }
            _ => {}
        }
    }

    fn on_link_notice(&mut self, notice: LinkNotice, now: FirmwareInstant) {
        match notice {
            LinkNotice::Status(link) => {
                self.link = link;
                status::record_link(link);
            }
            LinkNotice::Location(point) => self.location = Some(point),
            LinkNotice::TimeSync(unix_seconds) => self.clock.record(now, unix_seconds),
            LinkNotice::Configure(settings) => {
                self.contacts.apply(settings);
                if let Err(error) = self.contacts.persist(&mut self.store) {
                    log_store_error("persist", error);
                }
                log_contact_configured(self.contacts.has_valid_contact());
            }
        }
    }

    fn publish_state(&self) {
        status::record_state(
            self.orchestrator.state(),
            self.orchestrator.contact_missing(),
            self.orchestrator.has_failed_delivery(),
        );
    }
}

fn sources<'a>(
    contacts: &'a ContactRegistry,
    location: Option<GeoPoint>,
    clock: &ClockSync<FirmwareInstant>,
    now: FirmwareInstant,
) -> AlertSources<'a> {
    AlertSources {
        contacts,
        location,
        unix_time: clock.unix_seconds(now),
    }
}

fn accept_request(result: Result<AlertEvent, RequestError>, actions: &mut CoordinatorActions) {
    match result {
        Ok(event) => actions.dispatch = Some(event),
        Err(RequestError::Alert(AlertError::NoValidContact)) => {
            let _ = actions.haptics.push(HapticPattern::ContactMissing);
            log_alert_error("request", AlertError::NoValidContact);
        }
        Err(error) => log_request_refused(error),
    }
}

fn haptic_for(notice: &AlertNotice) -> Option<HapticPattern> {
    match notice {
        AlertNotice::CountdownStarted { .. } => Some(HapticPattern::CountdownStarted),
        AlertNotice::CountdownTick { .. } => Some(HapticPattern::CountdownTick),
        AlertNotice::NoValidContact => Some(HapticPattern::ContactMissing),
        AlertNotice::DeliverySucceeded(_) => Some(HapticPattern::Delivered),
        AlertNotice::DeliveryFailed { .. } => Some(HapticPattern::DeliveryFailed),
        AlertNotice::StateChanged { .. }
        | AlertNotice::LocationUnavailable
        | AlertNotice::TriggerIgnored(_) => None,
    }
}

#[cfg(target_os = "none")]
fn log_notice(notice: &AlertNotice) {
    match notice {
        AlertNotice::StateChanged { from, to } => {
            defmt::info!("alert: {} -> {}", from.label(), to.label());
        }
        AlertNotice::CountdownStarted { seconds } => {
            defmt::info!("alert: countdown started ({}s)", seconds);
        }
        AlertNotice::CountdownTick { .. } | AlertNotice::TriggerIgnored(_) => {}
        AlertNotice::NoValidContact => defmt::warn!("alert: trigger without emergency contact"),
        AlertNotice::LocationUnavailable => defmt::warn!("alert: sending without location"),
        AlertNotice::DeliverySucceeded(route) => {
            defmt::info!("alert: delivered via {}", route.label());
        }
        AlertNotice::DeliveryFailed {
            error,
            retry_available,
        } => defmt::warn!(
            "alert: delivery failed ({}) retry={}",
            error.label(),
            retry_available
        ),
    }
}

#[cfg(not(target_os = "none"))]
fn log_notice(notice: &AlertNotice) {
    match notice {
        AlertNotice::StateChanged { from, to } => println!("alert: {from} -> {to}"),
        AlertNotice::CountdownStarted { seconds } => {
            println!("alert: countdown started ({seconds}s)");
        }
        AlertNotice::CountdownTick { .. } | AlertNotice::TriggerIgnored(_) => {}
        AlertNotice::NoValidContact => println!("alert: trigger without emergency contact"),
        AlertNotice::LocationUnavailable => println!("alert: sending without location"),
        AlertNotice::DeliverySucceeded(route) => println!("alert: delivered via {route}"),
        AlertNotice::DeliveryFailed {
            error,
            retry_available,
        } => println!("alert: delivery failed ({error}) retry={retry_available}"),
    }
}

#[cfg(target_os = "none")]
fn log_alert_error(context: &str, error: AlertError) {
    defmt::warn!("alert: {} failed ({})", context, error.label());
}

#[cfg(not(target_os = "none"))]
fn log_alert_error(context: &str, error: AlertError) {
    println!("alert: {context} failed ({error})");
}

#[cfg(target_os = "none")]
fn log_request_refused(error: RequestError) {
    defmt::info!("alert: request refused ({})", defmt::Display2Format(&error));
}

#[cfg(not(target_os = "none"))]
fn log_request_refused(error: RequestError) {
    println!("alert: request refused ({error})");
}

#[cfg(target_os = "none")]
fn log_transition_refused(from: AlertState, to: AlertState) {
    defmt::warn!("alert: refused {} -> {}", from.label(), to.label());
}

#[cfg(not(target_os = "none"))]
fn log_transition_refused(from: AlertState, to: AlertState) {
    println!("alert: refused {from} -> {to}");
}

#[cfg(target_os = "none")]
fn log_store_error(operation: &str, error: StoreError) {
    defmt::error!("settings: {} failed ({})", operation, defmt::Display2Format(&error));
}

#[cfg(not(target_os = "none"))]
fn log_store_error(operation: &str, error: StoreError) {
    println!("settings: {operation} failed ({error})");
}

#[cfg(target_os = "none")]
fn log_contact_configured(valid: bool) {
    defmt::info!("settings: contact updated valid={}", valid);
}

#[cfg(not(target_os = "none"))]
fn log_contact_configured(valid: bool) {
    println!("settings: contact updated valid={valid}");
}
