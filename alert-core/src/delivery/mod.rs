//! Wrist-to-companion delivery with store-and-forward fallback.
//!
//! [`DeliveryChannel::send`] tries an acknowledged direct message while the
//! peer is reachable. Anything short of the peer's `status = received` reply
//! falls through to a durable transfer, which counts as delivered once the
//! transport accepts it. Transport failure signals are authoritative: there
//! is no timeout layered on top of [`PeerLink`].

mod inbound;

pub use inbound::{AlertSink, InboundDispatcher, InboundOutcome, LinkEvents};

use core::fmt;

use crate::error::AlertError;
use crate::wire::{self, AlertEvent, Envelope};

/// Transport-level failures reported by a [`PeerLink`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkError {
    /// The peer cannot be reached right now.
    Unreachable,
    /// No peer is paired; nothing can be queued either.
    NotPaired,
    /// The transport gave up waiting for the peer.
    Timeout,
    /// The transport reported an I/O or protocol failure.
    Transport,
    /// The peer replied without acknowledging receipt.
    Rejected,
}

impl LinkError {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::NotPaired => "not paired",
            Self::Timeout => "timeout",
            Self::Transport => "transport error",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<LinkError> for AlertError {
    fn from(error: LinkError) -> Self {
        match error {
            LinkError::Unreachable | LinkError::NotPaired => AlertError::TransportUnreachable,
            LinkError::Timeout | LinkError::Transport | LinkError::Rejected => {
                AlertError::TransportFailure
            }
        }
    }
}

/// Capabilities of the device-to-device transport.
#[allow(async_fn_in_trait)]
pub trait PeerLink {
    fn is_paired(&self) -> bool;

    fn is_reachable(&self) -> bool;

    /// Sends `message` interactively and resolves with the peer's reply.
    async fn send_message(&mut self, message: &Envelope) -> Result<Envelope, LinkError>;

    /// Queues `payload` durably; resolves once the transport has accepted it.
    async fn transfer(&mut self, payload: &Envelope) -> Result<(), LinkError>;
}

impl<L> PeerLink for &mut L
where
    L: PeerLink + ?Sized,
{
    fn is_paired(&self) -> bool {
        (**self).is_paired()
    }

    fn is_reachable(&self) -> bool {
        (**self).is_reachable()
    }

    async fn send_message(&mut self, message: &Envelope) -> Result<Envelope, LinkError> {
        (**self).send_message(message).await
    }

    async fn transfer(&mut self, payload: &Envelope) -> Result<(), LinkError> {
        (**self).transfer(payload).await
    }
}

/// Path that carried a successful delivery.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeliveryRoute {
    Direct,
    StoreAndForward,
}

impl DeliveryRoute {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::StoreAndForward => "store-and-forward",
        }
    }
}

impl fmt::Display for DeliveryRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one [`DeliveryChannel::send`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeliveryReceipt {
    /// Set when the alert was delivered (or durably queued).
    pub route: Option<DeliveryRoute>,
    /// Set when every path failed.
    pub error: Option<AlertError>,
    /// Why the direct attempt was skipped or failed, if it was.
    pub direct_failure: Option<LinkError>,
}

impl DeliveryReceipt {
    pub const fn delivered(route: DeliveryRoute) -> Self {
        Self {
            route: Some(route),
            error: None,
            direct_failure: None,
        }
    }

    pub const fn failed(error: AlertError) -> Self {
        Self {
            route: None,
            error: Some(error),
            direct_failure: None,
        }
    }

    const fn with_direct_failure(mut self, failure: Option<LinkError>) -> Self {
        self.direct_failure = failure;
        self
    }

    pub const fn is_success(&self) -> bool {
        self.route.is_some() && self.error.is_none()
    }
}

/// Running totals, exposed for status displays.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DeliveryStats {
    pub direct: u32,
    pub queued: u32,
    pub failed: u32,
}

impl DeliveryStats {
    fn record(&mut self, receipt: &DeliveryReceipt) {
        let counter = match receipt.route {
            Some(DeliveryRoute::Direct) => &mut self.direct,
            Some(DeliveryRoute::StoreAndForward) => &mut self.queued,
            None => &mut self.failed,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Sends alerts over a [`PeerLink`].
#[derive(Debug)]
pub struct DeliveryChannel<L> {
    link: L,
    stats: DeliveryStats,
}

impl<L> DeliveryChannel<L>
where
    L: PeerLink,
{
    pub const fn new(link: L) -> Self {
        Self {
            link,
            stats: DeliveryStats {
                direct: 0,
                queued: 0,
                failed: 0,
            },
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    pub fn into_inner(self) -> L {
        self.link
    }

    /// Encodes and delivers `event`.
    ///
    /// Encoding failures are terminal and never touch the transport.
    pub async fn send(&mut self, event: &AlertEvent) -> DeliveryReceipt {
        let receipt = match wire::encode_alert(event) {
            Ok(envelope) => self.deliver(&envelope).await,
            Err(error) => DeliveryReceipt::failed(error.into()),
        };
        self.stats.record(&receipt);
        receipt
    }

    async fn deliver(&mut self, envelope: &Envelope) -> DeliveryReceipt {
        let direct_failure = if self.link.is_reachable() {
            match self.link.send_message(envelope).await {
                Ok(reply) if wire::is_acknowledgement(&reply) => {
                    return DeliveryReceipt::delivered(DeliveryRoute::Direct);
                }
                Ok(_) => LinkError::Rejected,
                Err(error) => error,
            }
        } else {
            LinkError::Unreachable
        };

        if !self.link.is_paired() {
            return DeliveryReceipt::failed(AlertError::TransportFailure)
                .with_direct_failure(Some(LinkError::NotPaired));
        }

        match self.link.transfer(envelope).await {
            Ok(()) => DeliveryReceipt::delivered(DeliveryRoute::StoreAndForward),
            Err(_) => DeliveryReceipt::failed(AlertError::TransportFailure),
        }
        .with_direct_failure(Some(direct_failure))
    }
}
