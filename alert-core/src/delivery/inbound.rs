use crate::error::AlertError;
use crate::wire::{self, AlertEvent, Envelope};

/// Callbacks raised by the companion-side transport.
pub trait LinkEvents {
    fn on_reachability_changed(&mut self, reachable: bool);

    /// Handles an interactive message and returns the reply envelope.
    fn on_message_received(&mut self, message: &Envelope) -> Envelope;

    /// Handles a store-and-forward payload; no reply is possible.
    fn on_transfer_received(&mut self, payload: &Envelope);
}

/// Consumer of decoded alerts.
pub trait AlertSink {
    fn deliver(&mut self, event: AlertEvent);
}

impl<S> AlertSink for &mut S
where
    S: AlertSink + ?Sized,
{
    fn deliver(&mut self, event: AlertEvent) {
        (**self).deliver(event);
    }
}

/// Result of handling one inbound payload.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InboundOutcome {
    Delivered,
    /// The payload was unreadable and has been discarded.
    Dropped(AlertError),
}

/// Decodes inbound payloads and forwards alerts to a sink.
///
/// Undecodable payloads are counted and dropped; they never reach the sink.
#[derive(Debug)]
pub struct InboundDispatcher<S> {
    sink: S,
    reachable: bool,
    dropped: u32,
    last_outcome: Option<InboundOutcome>,
}

impl<S> InboundDispatcher<S>
where
    S: AlertSink,
{
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            reachable: false,
            dropped: 0,
            last_outcome: None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Number of payloads dropped because they could not be decoded.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn last_outcome(&self) -> Option<InboundOutcome> {
        self.last_outcome
    }

    /// Decodes `payload` and forwards it to the sink.
    pub fn dispatch(&mut self, payload: &Envelope) -> InboundOutcome {
        let outcome = match wire::decode_alert(payload) {
            Ok(event) => {
                self.sink.deliver(event);
                InboundOutcome::Delivered
            }
            Err(error) => {
                self.dropped = self.dropped.saturating_add(1);
                InboundOutcome::Dropped(error.into())
            }
        };
        self.last_outcome = Some(outcome);
        outcome
    }
}

impl<S> LinkEvents for InboundDispatcher<S>
where
    S: AlertSink,
{
    fn on_reachability_changed(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    fn on_message_received(&mut self, message: &Envelope) -> Envelope {
        match self.dispatch(message) {
            InboundOutcome::Delivered => wire::acknowledgement(),
            InboundOutcome::Dropped(_) => wire::rejection(),
        }
    }

    fn on_transfer_received(&mut self, payload: &Envelope) {
        self.dispatch(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{GeoPoint, encode_alert, encode_alert_fields, is_acknowledgement};

    #[derive(Default)]
    struct RecordingSink {
        events: heapless::Vec<AlertEvent, 4>,
    }

    impl AlertSink for RecordingSink {
        fn deliver(&mut self, event: AlertEvent) {
            self.events.push(event).expect("sink capacity");
        }
    }

    fn event() -> AlertEvent {
        AlertEvent::new(
            1_700_000_000.0,
            GeoPoint::new(35.6586, 139.7454),
            "Ada",
            "5550100",
            "Grace",
        )
        .expect("event")
    }

    #[test]
    fn message_is_acknowledged_and_forwarded() {
        let mut dispatcher = InboundDispatcher::new(RecordingSink::default());
        let reply = dispatcher.on_message_received(&encode_alert(&event()).expect("encode"));

        assert!(is_acknowledgement(&reply));
        assert_eq!(dispatcher.sink().events.as_slice(), &[event()]);
        assert_eq!(dispatcher.last_outcome(), Some(InboundOutcome::Delivered));
    }

    #[test]
    fn per_field_transfer_is_accepted() {
        let mut dispatcher = InboundDispatcher::new(RecordingSink::default());
        dispatcher.on_transfer_received(&encode_alert_fields(&event()).expect("encode"));

        assert_eq!(dispatcher.sink().events.len(), 1);
        assert_eq!(dispatcher.dropped(), 0);
    }

    #[test]
    fn garbage_is_dropped_and_rejected() {
        let mut dispatcher = InboundDispatcher::new(RecordingSink::default());
        let mut garbage = Envelope::new();
        garbage
            .insert_bytes(wire::ALERT_PAYLOAD_KEY, &[0xff, 0x01])
            .expect("insert");

        let reply = dispatcher.on_message_received(&garbage);
        assert!(!is_acknowledgement(&reply));
        assert!(dispatcher.sink().events.is_empty());
        assert_eq!(dispatcher.dropped(), 1);
        assert_eq!(
            dispatcher.last_outcome(),
            Some(InboundOutcome::Dropped(AlertError::DecodeFailure))
        );
    }

    #[test]
    fn reachability_is_tracked() {
        let mut dispatcher = InboundDispatcher::new(RecordingSink::default());
        dispatcher.on_reachability_changed(true);
        assert!(dispatcher.is_reachable());
        dispatcher.on_reachability_changed(false);
        assert!(!dispatcher.is_reachable());
    }
}
