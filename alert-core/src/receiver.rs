//! Companion-side handling of received alerts.
//!
//! [`Companion::on_receive`] runs the receipt steps in a fixed order:
//! prepend to history, truncate, persist, sync the contact, notify, then
//! text the contact. Each step reports its own outcome in the returned
//! [`ReceiveReport`]; a failing step never prevents the ones after it.

use core::fmt;

use crate::contact::{ContactRegistry, EmergencyContact};
use crate::delivery::AlertSink;
use crate::history::{AlertHistoryStore, DEFAULT_HISTORY_CAPACITY};
use crate::message::{self, NOTIFICATION_TITLE};
use crate::store::{KeyValueStore, StoreError};
use crate::wire::AlertEvent;

/// Failure reported by a notification or text-message collaborator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SinkError {
    /// The capability is missing or was denied.
    Unavailable,
    /// The collaborator refused the request.
    Rejected,
    /// The alert carried no phone number to text.
    NoRecipient,
    /// The rendered message did not fit its buffer.
    MessageTooLong,
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("unavailable"),
            Self::Rejected => f.write_str("rejected"),
            Self::NoRecipient => f.write_str("no recipient"),
            Self::MessageTooLong => f.write_str("message too long"),
        }
    }
}

/// Local notification capability.
pub trait NotificationSink {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), SinkError>;
}

/// Text-message capability with a URL-scheme fallback.
pub trait TextMessageSink {
    /// Returns `true` when an interactive composer can be presented.
    fn can_compose(&self) -> bool;

    fn compose(&mut self, recipient: &str, body: &str) -> Result<(), SinkError>;

    fn open_url(&mut self, url: &str) -> Result<(), SinkError>;
}

/// How the text message was handed off.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TextRoute {
    Composer,
    Url,
}

/// Per-step outcome of [`Companion::on_receive`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReceiveReport {
    /// An older entry was dropped to respect the capacity.
    pub evicted: bool,
    pub persisted: Result<(), StoreError>,
    /// The local contact was overwritten from the alert.
    pub contact_synced: bool,
    pub contact_persisted: Result<(), StoreError>,
    pub notified: Result<(), SinkError>,
    pub texted: Result<TextRoute, SinkError>,
}

/// Receiving device state: history, contact, persistence, and sinks.
pub struct Companion<S, N, T, const CAP: usize = DEFAULT_HISTORY_CAPACITY> {
    history: AlertHistoryStore<CAP>,
    contacts: ContactRegistry,
    store: S,
    notifications: N,
    texts: T,
    utc_offset_minutes: i32,
    last_report: Option<ReceiveReport>,
}

impl<S, N, T, const CAP: usize> Companion<S, N, T, CAP>
where
    S: KeyValueStore,
    N: NotificationSink,
    T: TextMessageSink,
{
    /// Restores history and contact settings from `store`.
    pub fn load(store: S, notifications: N, texts: T) -> Result<Self, StoreError> {
        let history = AlertHistoryStore::load(&store)?;
        let contacts = ContactRegistry::load(&store)?;
        Ok(Self {
            history,
            contacts,
            store,
            notifications,
            texts,
            utc_offset_minutes: 0,
            last_report: None,
        })
    }

    /// Renders timestamps at `minutes` east of UTC.
    #[must_use]
    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn history(&self) -> &AlertHistoryStore<CAP> {
        &self.history
    }

    pub fn contacts(&self) -> &ContactRegistry {
        &self.contacts
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    pub fn texts(&self) -> &T {
        &self.texts
    }

    pub fn texts_mut(&mut self) -> &mut T {
        &mut self.texts
    }

    pub fn last_report(&self) -> Option<&ReceiveReport> {
        self.last_report.as_ref()
    }

    /// Sets the contact from local input and persists it.
    pub fn set_contact(&mut self, contact: EmergencyContact) -> Result<(), StoreError> {
        self.contacts.set_contact(contact);
        self.contacts.persist(&mut self.store)
    }

    /// Handles one decoded alert.
    pub fn on_receive(&mut self, event: AlertEvent) -> ReceiveReport {
        let body = message::alert_body(&event, self.utc_offset_minutes);
        let evicted = self.history.push(event.clone()).is_some();
        let persisted = self.history.persist(&mut self.store);

        let contact_synced = self.contacts.sync_from(&event);
        let contact_persisted = if contact_synced {
            self.contacts.persist(&mut self.store)
        } else {
            Ok(())
        };

        let notified = match &body {
            Ok(body) => self.notifications.notify(NOTIFICATION_TITLE, body),
            Err(_) => Err(SinkError::MessageTooLong),
        };
        let texted = match &body {
            Ok(body) => self.send_text(event.contact_phone(), body),
            Err(_) => Err(SinkError::MessageTooLong),
        };

        ReceiveReport {
            evicted,
            persisted,
            contact_synced,
            contact_persisted,
            notified,
            texted,
        }
    }

    /// Empties the history and deletes its snapshot. Irreversible.
    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.history.clear(&mut self.store)
    }

    fn send_text(&mut self, recipient: &str, body: &str) -> Result<TextRoute, SinkError> {
        if recipient.is_empty() {
            return Err(SinkError::NoRecipient);
        }

        if self.texts.can_compose() {
            self.texts.compose(recipient, body)?;
            return Ok(TextRoute::Composer);
        }

        let url = message::sms_url(recipient, body).map_err(|_| SinkError::MessageTooLong)?;
        self.texts.open_url(&url)?;
        Ok(TextRoute::Url)
    }
}

impl<S, N, T, const CAP: usize> AlertSink for Companion<S, N, T, CAP>
where
    S: KeyValueStore,
    N: NotificationSink,
    T: TextMessageSink,
{
    fn deliver(&mut self, event: AlertEvent) {
        self.last_report = Some(self.on_receive(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HISTORY_KEY, HISTORY_SCRATCH};
    use crate::store::MemoryStore;
    use crate::wire::GeoPoint;
    use heapless::{String, Vec};

    type Store = MemoryStore<4, HISTORY_SCRATCH>;

    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        titles: Vec<String<32>, 4>,
    }

    impl NotificationSink for RecordingNotifier {
        fn notify(&mut self, title: &str, _body: &str) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError::Unavailable);
            }
            self.titles
                .push(String::try_from(title).expect("title fits"))
                .expect("capacity");
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTexts {
        composer: bool,
        composed: Vec<String<24>, 4>,
        urls: usize,
    }

    impl TextMessageSink for RecordingTexts {
        fn can_compose(&self) -> bool {
            self.composer
        }

        fn compose(&mut self, recipient: &str, _body: &str) -> Result<(), SinkError> {
            self.composed
                .push(String::try_from(recipient).expect("phone fits"))
                .expect("capacity");
            Ok(())
        }

        fn open_url(&mut self, url: &str) -> Result<(), SinkError> {
            assert!(url.starts_with("sms:5550100&body="));
            self.urls += 1;
            Ok(())
        }
    }

    fn event(phone: &str) -> AlertEvent {
        AlertEvent::new(
            1_700_000_000.0,
            GeoPoint::new(48.8584, 2.2945),
            "Ada",
            phone,
            "Grace",
        )
        .expect("event")
    }

    fn companion(
        texts: RecordingTexts,
    ) -> Companion<Store, RecordingNotifier, RecordingTexts, 3> {
        Companion::load(Store::new(), RecordingNotifier::default(), texts).expect("load")
    }

    #[test]
    fn receipt_syncs_contact_and_notifies() {
        let mut companion = companion(RecordingTexts::default());
        let report = companion.on_receive(event("5550100"));

        assert_eq!(report.persisted, Ok(()));
        assert!(report.contact_synced);
        assert_eq!(report.notified, Ok(()));
        assert_eq!(report.texted, Ok(TextRoute::Url));
        assert_eq!(
            companion.contacts().valid_contact().map(EmergencyContact::phone_number),
            Some("5550100")
        );
        assert_eq!(companion.notifications().titles[0].as_str(), "Emergency Alert");
        assert!(companion.store().contains(HISTORY_KEY));
    }

    #[test]
    fn composer_is_preferred_when_available() {
        let mut companion = companion(RecordingTexts {
            composer: true,
            ..RecordingTexts::default()
        });
        let report = companion.on_receive(event("5550100"));

        assert_eq!(report.texted, Ok(TextRoute::Composer));
        assert_eq!(companion.texts().composed[0].as_str(), "5550100");
        assert_eq!(companion.texts().urls, 0);
    }

    #[test]
    fn notification_failure_does_not_block_text() {
        let mut companion: Companion<Store, RecordingNotifier, RecordingTexts, 3> = Companion::load(
            Store::new(),
            RecordingNotifier {
                fail: true,
                ..RecordingNotifier::default()
            },
            RecordingTexts::default(),
        )
        .expect("load");

        let report = companion.on_receive(event("5550100"));
        assert_eq!(report.notified, Err(SinkError::Unavailable));
        assert_eq!(report.texted, Ok(TextRoute::Url));
    }

    #[test]
    fn alert_without_phone_keeps_existing_contact() {
        let mut companion = companion(RecordingTexts::default());
        companion
            .set_contact(EmergencyContact::new("Local", "5550199").expect("contact"))
            .expect("persist");

        let report = companion.on_receive(event(""));
        assert!(!report.contact_synced);
        assert_eq!(report.texted, Err(SinkError::NoRecipient));
        assert_eq!(
            companion.contacts().valid_contact().map(EmergencyContact::name),
            Some("Local")
        );
        assert_eq!(companion.history().len(), 1);
    }

    #[test]
    fn history_is_bounded_and_reloads() {
        let mut companion = companion(RecordingTexts::default());
        let mut evictions = 0;
        for _ in 0..5 {
            if companion.on_receive(event("5550100")).evicted {
                evictions += 1;
            }
        }
        assert_eq!(companion.history().len(), 3);
        assert_eq!(evictions, 2);

        let Companion { store, .. } = companion;
        let reloaded: Companion<Store, RecordingNotifier, RecordingTexts, 3> =
            Companion::load(store, RecordingNotifier::default(), RecordingTexts::default())
                .expect("reload");
        assert_eq!(reloaded.history().len(), 3);
        assert!(reloaded.contacts().has_valid_contact());
    }

    #[test]
    fn clear_history_removes_snapshot() {
        let mut companion = companion(RecordingTexts::default());
        companion.on_receive(event("5550100"));
        companion.clear_history().expect("clear");

        assert!(companion.history().is_empty());
        assert!(!companion.store().contains(HISTORY_KEY));
    }

    #[test]
    fn sink_impl_records_report() {
        let mut companion = companion(RecordingTexts::default());
        companion.deliver(event("5550100"));
        assert!(companion.last_report().is_some_and(|report| report.contact_synced));
    }
}
