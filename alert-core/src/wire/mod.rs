//! Alert record and its device-to-device encoding.
//!
//! An [`AlertEvent`] travels as a single postcard blob stored under
//! [`ALERT_PAYLOAD_KEY`] inside an [`Envelope`]. Receivers decode that blob
//! first and fall back to reading the record field by field from the
//! envelope before giving up with [`WireError::Decode`].
//!
//! The blob has no version tag; a schema change on one side makes decoding
//! fail on the other.

mod envelope;

pub use envelope::{
    Envelope, EnvelopeValue, MAX_ENVELOPE_BYTES, MAX_ENVELOPE_ENTRIES, MAX_ENVELOPE_KEY,
    MAX_ENVELOPE_TEXT,
};

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::contact::{MAX_NAME_LEN, MAX_PHONE_DIGITS, PersonName, PhoneNumber};
use crate::error::AlertError;

/// Envelope key carrying the serialized alert.
pub const ALERT_PAYLOAD_KEY: &str = "alertData";

/// Envelope key used by acknowledgement replies.
pub const STATUS_KEY: &str = "status";

/// Status value that marks a successful receipt.
pub const STATUS_RECEIVED: &str = "received";

/// Status value sent when an inbound message could not be used.
pub const STATUS_REJECTED: &str = "rejected";

/// Upper bound on an encoded [`AlertEvent`].
pub const MAX_ALERT_BLOB: usize = MAX_ENVELOPE_BYTES;

const FIELD_TIMESTAMP: &str = "timestamp";
const FIELD_LATITUDE: &str = "latitude";
const FIELD_LONGITUDE: &str = "longitude";
const FIELD_CONTACT_NAME: &str = "contactName";
const FIELD_CONTACT_PHONE: &str = "contactPhone";
const FIELD_WEARER_NAME: &str = "wearerName";

/// Codec failures.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WireError {
    /// The record could not be serialized into the bounded blob.
    Encode,
    /// Neither the blob nor the per-field shape could be decoded.
    Decode,
    /// A string or blob exceeded its bound.
    FieldTooLong,
    /// The envelope has no room for another key.
    EnvelopeFull,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => f.write_str("encode failed"),
            Self::Decode => f.write_str("decode failed"),
            Self::FieldTooLong => f.write_str("field too long"),
            Self::EnvelopeFull => f.write_str("envelope full"),
        }
    }
}

impl From<WireError> for AlertError {
    fn from(error: WireError) -> Self {
        match error {
            WireError::Decode => AlertError::DecodeFailure,
            WireError::Encode | WireError::FieldTooLong | WireError::EnvelopeFull => {
                AlertError::EncodeFailure
            }
        }
    }
}

/// Geographic position in decimal degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Placeholder used when no location fix is known.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Immutable record produced once per completed countdown or test alert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    timestamp: f64,
    latitude: f64,
    longitude: f64,
    contact_name: PersonName,
    contact_phone: PhoneNumber,
    wearer_name: PersonName,
}

impl AlertEvent {
    /// Builds an event; fails when a string exceeds its wire bound.
    pub fn new(
        timestamp: f64,
        location: GeoPoint,
        contact_name: &str,
        contact_phone: &str,
        wearer_name: &str,
    ) -> Result<Self, WireError> {
        Ok(Self {
            timestamp,
            latitude: location.latitude,
            longitude: location.longitude,
            contact_name: bounded::<MAX_NAME_LEN>(contact_name)?,
            contact_phone: bounded::<MAX_PHONE_DIGITS>(contact_phone)?,
            wearer_name: bounded::<MAX_NAME_LEN>(wearer_name)?,
        })
    }

    /// Seconds since the Unix epoch.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn contact_name(&self) -> &str {
        &self.contact_name
    }

    pub fn contact_phone(&self) -> &str {
        &self.contact_phone
    }

    pub fn wearer_name(&self) -> &str {
        &self.wearer_name
    }
}

fn bounded<const N: usize>(value: &str) -> Result<String<N>, WireError> {
    String::try_from(value).map_err(|_| WireError::FieldTooLong)
}

/// Serializes `event` into an envelope holding a single opaque blob.
pub fn encode_alert(event: &AlertEvent) -> Result<Envelope, WireError> {
    let mut scratch = [0u8; MAX_ALERT_BLOB];
    let blob = postcard::to_slice(event, &mut scratch).map_err(|_| WireError::Encode)?;

    let mut envelope = Envelope::new();
    envelope.insert_bytes(ALERT_PAYLOAD_KEY, blob)?;
    Ok(envelope)
}

/// Expresses `event` as one envelope key per field.
///
/// This is the shape accepted by the compatibility path of [`decode_alert`].
pub fn encode_alert_fields(event: &AlertEvent) -> Result<Envelope, WireError> {
    let mut envelope = Envelope::new();
    envelope.insert_number(FIELD_TIMESTAMP, event.timestamp)?;
    envelope.insert_number(FIELD_LATITUDE, event.latitude)?;
    envelope.insert_number(FIELD_LONGITUDE, event.longitude)?;
    envelope.insert_text(FIELD_CONTACT_NAME, &event.contact_name)?;
    envelope.insert_text(FIELD_CONTACT_PHONE, &event.contact_phone)?;
    envelope.insert_text(FIELD_WEARER_NAME, &event.wearer_name)?;
    Ok(envelope)
}

/// Decodes an inbound envelope into an [`AlertEvent`].
pub fn decode_alert(envelope: &Envelope) -> Result<AlertEvent, WireError> {
    envelope
        .bytes(ALERT_PAYLOAD_KEY)
        .and_then(|blob| postcard::from_bytes(blob).ok())
        .or_else(|| decode_fields(envelope))
        .ok_or(WireError::Decode)
}

fn decode_fields(envelope: &Envelope) -> Option<AlertEvent> {
    let location = GeoPoint::new(
        envelope.number(FIELD_LATITUDE)?,
        envelope.number(FIELD_LONGITUDE)?,
    );

    AlertEvent::new(
        envelope.number(FIELD_TIMESTAMP)?,
        location,
        envelope.text(FIELD_CONTACT_NAME)?,
        envelope.text(FIELD_CONTACT_PHONE)?,
        envelope.text(FIELD_WEARER_NAME)?,
    )
    .ok()
}

/// Reply sent by a receiver that accepted a direct message.
pub fn acknowledgement() -> Envelope {
    status_reply(STATUS_RECEIVED)
}

/// Reply sent by a receiver that could not use a direct message.
pub fn rejection() -> Envelope {
    status_reply(STATUS_REJECTED)
}

/// Returns `true` only for a reply carrying the receipt status.
pub fn is_acknowledgement(reply: &Envelope) -> bool {
    reply.text(STATUS_KEY) == Some(STATUS_RECEIVED)
}

fn status_reply(status: &str) -> Envelope {
    let mut envelope = Envelope::new();
    // Both constants fit the bounded key and text.
    let _ = envelope.insert_text(STATUS_KEY, status);
    envelope
}
