//! Alert pipeline plumbing shared by the wrist tasks.
//!
//! The sensor, button, and link tasks feed [`AlertInput`]s into one queue
//! consumed by the alert task, which owns the [`AlertCoordinator`]. The
//! coordinator answers with detector commands, alerts to dispatch, and haptic
//! patterns, each routed through its own bounded channel on [`AlertBus`].

pub mod coordinator;

pub use coordinator::{AlertCoordinator, CoordinatorActions, MAX_HAPTICS, WristStore};

use alert_core::delivery::DeliveryReceipt;
use alert_core::link::LinkNotice;
use alert_core::orchestrator::DetectorCommand;
use alert_core::wire::AlertEvent;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;

use crate::clock::FirmwareInstant;

/// Depth of the coordinator input queue.
pub const INPUT_QUEUE_DEPTH: usize = 8;

/// Alerts waiting for the link task. One in flight plus one retry.
pub const DISPATCH_QUEUE_DEPTH: usize = 2;

pub const HAPTIC_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
type AlertMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type AlertMutex = NoopRawMutex;

/// Everything the coordinator reacts to.
#[derive(Clone, Debug, PartialEq)]
pub enum AlertInput {
    /// The detector fired on the sample taken at this instant.
    Trigger(FirmwareInstant),
    /// Short press of the wrist button.
    Button,
    /// Long press of the wrist button.
    TestAlert,
    DeliveryFinished(DeliveryReceipt),
    Link(LinkNotice),
    /// Periodic evaluation of countdown and cooldown deadlines.
    Tick,
}

/// Vibration patterns played by the haptic task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HapticPattern {
    CountdownStarted,
    /// One pulse per whole second left in the countdown.
    CountdownTick,
    Cancelled,
    Delivered,
    DeliveryFailed,
    /// A trigger fired with no emergency contact configured.
    ContactMissing,
}

impl HapticPattern {
    /// Pulse on/off lengths in milliseconds.
    pub const fn pulses(self) -> &'static [(u16, u16)] {
        match self {
            Self::CountdownStarted => &[(400, 150), (400, 0)],
            Self::CountdownTick => &[(60, 0)],
            Self::Cancelled => &[(120, 80), (120, 0)],
            Self::Delivered => &[(250, 0)],
            Self::DeliveryFailed => &[(600, 150), (600, 150), (600, 0)],
            Self::ContactMissing => &[(80, 80), (80, 80), (80, 80), (80, 0)],
        }
    }
}

pub type InputChannel = Channel<AlertMutex, AlertInput, INPUT_QUEUE_DEPTH>;
pub type InputSender<'a> = Sender<'a, AlertMutex, AlertInput, INPUT_QUEUE_DEPTH>;
pub type InputReceiver<'a> = Receiver<'a, AlertMutex, AlertInput, INPUT_QUEUE_DEPTH>;

pub type DispatchChannel = Channel<AlertMutex, AlertEvent, DISPATCH_QUEUE_DEPTH>;
pub type DispatchSender<'a> = Sender<'a, AlertMutex, AlertEvent, DISPATCH_QUEUE_DEPTH>;
pub type DispatchReceiver<'a> = Receiver<'a, AlertMutex, AlertEvent, DISPATCH_QUEUE_DEPTH>;

pub type HapticChannel = Channel<AlertMutex, HapticPattern, HAPTIC_QUEUE_DEPTH>;
pub type HapticSender<'a> = Sender<'a, AlertMutex, HapticPattern, HAPTIC_QUEUE_DEPTH>;
pub type HapticReceiver<'a> = Receiver<'a, AlertMutex, HapticPattern, HAPTIC_QUEUE_DEPTH>;

/// Latest detector command; a newer command replaces an unread one.
pub type DetectorSignal = Signal<AlertMutex, DetectorCommand>;

/// Bundles every alert channel so tasks can share a single static.
pub struct AlertBus {
    pub inputs: InputChannel,
    pub dispatch: DispatchChannel,
    pub haptics: HapticChannel,
    pub detector: DetectorSignal,
}

impl AlertBus {
    pub const fn new() -> Self {
        Self {
            inputs: Channel::new(),
            dispatch: Channel::new(),
            haptics: Channel::new(),
            detector: Signal::new(),
        }
    }

    /// Routes coordinator output to the owning tasks without blocking.
    ///
    /// Returns the number of haptic patterns dropped because the queue was
    /// full. A full dispatch queue means an alert is lost, so that path waits.
    pub async fn publish(&self, actions: CoordinatorActions) -> usize {
        if let Some(command) = actions.detector {
            self.detector.signal(command);
        }

        let mut dropped = 0;
        for pattern in actions.haptics {
            if self.haptics.try_send(pattern).is_err() {
                dropped += 1;
            }
        }

        if let Some(event) = actions.dispatch {
            self.dispatch.send(event).await;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_core::wire::GeoPoint;
    use embassy_futures::block_on;
    use heapless::Vec;

    #[test]
    fn publish_routes_each_action() {
        let bus = AlertBus::new();
        let event = AlertEvent::new(1.0, GeoPoint::ORIGIN, "Sam", "5550100", "Ada")
            .expect("event");
        let mut haptics = Vec::new();
        haptics.push(HapticPattern::CountdownTick).expect("push");

        let dropped = block_on(bus.publish(CoordinatorActions {
            detector: Some(DetectorCommand::Reset),
            dispatch: Some(event.clone()),
            haptics,
        }));

        assert_eq!(dropped, 0);
        assert_eq!(bus.detector.try_take(), Some(DetectorCommand::Reset));
        assert_eq!(bus.dispatch.try_receive().ok(), Some(event));
        assert_eq!(bus.haptics.try_receive().ok(), Some(HapticPattern::CountdownTick));
    }

    #[test]
    fn overflowing_haptics_are_dropped() {
        let bus = AlertBus::new();
        for _ in 0..HAPTIC_QUEUE_DEPTH {
            bus.haptics.try_send(HapticPattern::Delivered).expect("fill");
        }
        let mut haptics = Vec::new();
        haptics.push(HapticPattern::Cancelled).expect("push");

        let dropped = block_on(bus.publish(CoordinatorActions {
            haptics,
            ..CoordinatorActions::default()
        }));
        assert_eq!(dropped, 1);
    }
}
