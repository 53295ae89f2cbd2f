//! Typed messages exchanged with the wrist's radio module.
//!
//! [`frame`] handles the byte framing; this module maps frame kinds to
//! postcard-encoded payloads. Requests flow from the wrist to the radio
//! ([`RadioRequest`]), everything else flows back ([`RadioEvent`]).

pub mod frame;

pub use frame::{
    FRAME_SYNC, Frame, FrameAccumulator, FrameError, FrameKind, MAX_FRAME_LEN, MAX_FRAME_PAYLOAD,
    decode_frame,
};

use serde::{Deserialize, Serialize};

use crate::contact::ContactSettings;
use crate::delivery::LinkError;
use crate::wire::{Envelope, GeoPoint};

/// Pairing and reachability reported by the radio module.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub paired: bool,
    pub reachable: bool,
}

/// Unsolicited updates pushed by the companion through the radio.
#[derive(Clone, Debug, PartialEq)]
pub enum LinkNotice {
    Status(LinkStatus),
    Location(GeoPoint),
    /// Seconds since the Unix epoch.
    TimeSync(f64),
    Configure(ContactSettings),
}

/// Frames the wrist sends to the radio.
#[derive(Clone, Debug, PartialEq)]
pub enum RadioRequest {
    Message(Envelope),
    Transfer(Envelope),
}

/// Frames the radio sends to the wrist.
#[derive(Clone, Debug, PartialEq)]
pub enum RadioEvent {
    Reply(Envelope),
    SendFailed(LinkError),
    TransferQueued,
    TransferFailed(LinkError),
    Notice(LinkNotice),
}

impl RadioRequest {
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            Self::Message(envelope) => postcard_frame(FrameKind::Message, envelope),
            Self::Transfer(envelope) => postcard_frame(FrameKind::Transfer, envelope),
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        match frame.kind() {
            FrameKind::Message => Ok(Self::Message(from_payload(frame)?)),
            FrameKind::Transfer => Ok(Self::Transfer(from_payload(frame)?)),
            _ => Err(FrameError::Malformed),
        }
    }
}

impl RadioEvent {
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        match self {
            Self::Reply(envelope) => postcard_frame(FrameKind::Reply, envelope),
            Self::SendFailed(error) => Frame::new(FrameKind::SendFailed, &[error_code(*error)]),
            Self::TransferQueued => Ok(Frame::empty(FrameKind::TransferQueued)),
            Self::TransferFailed(error) => {
                Frame::new(FrameKind::TransferFailed, &[error_code(*error)])
            }
            Self::Notice(LinkNotice::Status(status)) => postcard_frame(FrameKind::LinkStatus, status),
            Self::Notice(LinkNotice::Location(point)) => postcard_frame(FrameKind::Location, point),
            Self::Notice(LinkNotice::TimeSync(unix)) => postcard_frame(FrameKind::TimeSync, unix),
            Self::Notice(LinkNotice::Configure(settings)) => {
                postcard_frame(FrameKind::Configure, settings)
            }
        }
    }

    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        Ok(match frame.kind() {
            FrameKind::Reply => Self::Reply(from_payload(frame)?),
            FrameKind::SendFailed => Self::SendFailed(error_from_payload(frame)?),
            FrameKind::TransferQueued => Self::TransferQueued,
            FrameKind::TransferFailed => Self::TransferFailed(error_from_payload(frame)?),
            FrameKind::LinkStatus => Self::Notice(LinkNotice::Status(from_payload(frame)?)),
            FrameKind::Location => Self::Notice(LinkNotice::Location(from_payload(frame)?)),
            FrameKind::TimeSync => Self::Notice(LinkNotice::TimeSync(from_payload(frame)?)),
            FrameKind::Configure => Self::Notice(LinkNotice::Configure(from_payload(frame)?)),
            FrameKind::Message | FrameKind::Transfer => return Err(FrameError::Malformed),
        })
    }
}

fn postcard_frame<T: Serialize>(kind: FrameKind, value: &T) -> Result<Frame, FrameError> {
    let mut scratch = [0u8; MAX_FRAME_PAYLOAD];
    let payload = postcard::to_slice(value, &mut scratch).map_err(|_| FrameError::TooLarge)?;
    Frame::new(kind, payload)
}

fn from_payload<T>(frame: &Frame) -> Result<T, FrameError>
where
    T: for<'de> Deserialize<'de>,
{
    postcard::from_bytes(frame.payload()).map_err(|_| FrameError::Malformed)
}

const fn error_code(error: LinkError) -> u8 {
    match error {
        LinkError::Unreachable => 1,
        LinkError::NotPaired => 2,
        LinkError::Timeout => 3,
        LinkError::Transport => 4,
        LinkError::Rejected => 5,
    }
}

fn error_from_payload(frame: &Frame) -> Result<LinkError, FrameError> {
    match frame.payload() {
        [1] => Ok(LinkError::Unreachable),
        [2] => Ok(LinkError::NotPaired),
        [3] => Ok(LinkError::Timeout),
        [5] => Ok(LinkError::Rejected),
        [_] => Ok(LinkError::Transport),
        _ => Err(FrameError::Malformed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::EmergencyContact;
    use crate::wire::acknowledgement;

    #[test]
    fn events_survive_framing() {
        let settings = ContactSettings {
            contact: EmergencyContact::new("Ada", "555 0100").expect("contact"),
            wearer_name: None,
        };
        let events = [
            RadioEvent::Reply(acknowledgement()),
            RadioEvent::SendFailed(LinkError::Timeout),
            RadioEvent::TransferQueued,
            RadioEvent::Notice(LinkNotice::Status(LinkStatus {
                paired: true,
                reachable: false,
            })),
            RadioEvent::Notice(LinkNotice::Location(GeoPoint::new(-33.8568, 151.2153))),
            RadioEvent::Notice(LinkNotice::Configure(settings)),
        ];

        for event in events {
            let frame = event.to_frame().expect("frame");
            assert_eq!(RadioEvent::from_frame(&frame), Ok(event));
        }
    }

    #[test]
    fn requests_are_not_events() {
        let frame = RadioRequest::Transfer(acknowledgement())
            .to_frame()
            .expect("frame");
        assert_eq!(frame.kind(), FrameKind::Transfer);
        assert_eq!(RadioEvent::from_frame(&frame), Err(FrameError::Malformed));
        assert_eq!(
            RadioRequest::from_frame(&frame),
            Ok(RadioRequest::Transfer(acknowledgement()))
        );
    }

    #[test]
    fn unknown_failure_code_maps_to_transport() {
        let frame = Frame::new(FrameKind::TransferFailed, &[0x44]).expect("frame");
        assert_eq!(
            RadioEvent::from_frame(&frame),
            Ok(RadioEvent::TransferFailed(LinkError::Transport))
        );
    }
}
