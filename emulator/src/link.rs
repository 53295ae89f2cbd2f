//! In-process radio link between the emulated wrist and phone.

use std::collections::VecDeque;

use alert_core::AlertError;
use alert_core::delivery::{InboundDispatcher, InboundOutcome, LinkError, LinkEvents, PeerLink};
use alert_core::receiver::{Companion, ReceiveReport};
use alert_core::store::StoreError;
use alert_core::wire::Envelope;

use crate::sinks::{ConsoleNotifier, ConsoleTexts};
use crate::store::FileStore;

pub type Phone = Companion<FileStore, ConsoleNotifier, ConsoleTexts>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkMode {
    Reachable,
    Unreachable,
    Unpaired,
}

impl LinkMode {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "reachable" => Some(Self::Reachable),
            "unreachable" => Some(Self::Unreachable),
            "unpaired" => Some(Self::Unpaired),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Reachable => "reachable",
            Self::Unreachable => "unreachable",
            Self::Unpaired => "unpaired",
        }
    }
}

/// Something the phone did in response to link traffic.
#[derive(Clone, Debug, PartialEq)]
pub enum PhoneActivity {
    Received(ReceiveReport),
    Dropped(AlertError),
}

/// Loopback link; transfers wait in a queue until the phone is reachable.
pub struct SimLink {
    phone: InboundDispatcher<Phone>,
    mode: LinkMode,
    queued: VecDeque<Envelope>,
    activity: Vec<PhoneActivity>,
}

impl SimLink {
    pub fn new(phone: Phone, mode: LinkMode) -> Self {
        let mut phone = InboundDispatcher::new(phone);
        phone.on_reachability_changed(mode == LinkMode::Reachable);
        Self {
            phone,
            mode,
            queued: VecDeque::new(),
            activity: Vec::new(),
        }
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    pub fn phone(&self) -> &Phone {
        self.phone.sink()
    }

    /// Clears the phone's history and its persisted copy.
    pub fn clear_history(&mut self) -> Result<(), StoreError> {
        self.phone.sink_mut().clear_history()
    }

    /// Changes reachability; becoming reachable flushes queued transfers.
    pub fn set_mode(&mut self, mode: LinkMode) {
        self.mode = mode;
        let reachable = mode == LinkMode::Reachable;
        self.phone.on_reachability_changed(reachable);
        if reachable {
            while let Some(payload) = self.queued.pop_front() {
                self.phone.on_transfer_received(&payload);
                self.record_outcome();
            }
        }
    }

    /// Returns and clears the phone activity since the last call.
    pub fn take_activity(&mut self) -> Vec<PhoneActivity> {
        std::mem::take(&mut self.activity)
    }

    fn record_outcome(&mut self) {
        let activity = match self.phone.last_outcome() {
            Some(InboundOutcome::Delivered) => self
                .phone
                .sink()
                .last_report()
                .copied()
                .map(PhoneActivity::Received),
            Some(InboundOutcome::Dropped(error)) => Some(PhoneActivity::Dropped(error)),
            None => None,
        };
        self.activity.extend(activity);
    }
}

impl PeerLink for SimLink {
    fn is_paired(&self) -> bool {
        self.mode != LinkMode::Unpaired
    }

    fn is_reachable(&self) -> bool {
        self.mode == LinkMode::Reachable
    }

    async fn send_message(&mut self, message: &Envelope) -> Result<Envelope, LinkError> {
        if self.mode != LinkMode::Reachable {
            return Err(LinkError::Unreachable);
        }
        let reply = self.phone.on_message_received(message);
        self.record_outcome();
        Ok(reply)
    }

    async fn transfer(&mut self, payload: &Envelope) -> Result<(), LinkError> {
        if self.mode == LinkMode::Unpaired {
            return Err(LinkError::NotPaired);
        }
        if self.mode == LinkMode::Reachable {
            self.phone.on_transfer_received(payload);
            self.record_outcome();
        } else {
            self.queued.push_back(payload.clone());
        }
        Ok(())
    }
}
