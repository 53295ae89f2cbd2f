//! Error taxonomy shared by every alert pipeline stage.

use core::fmt;

/// Failure conditions surfaced by detection, delivery, and receipt.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AlertError {
    /// The accelerometer capability reported itself unavailable.
    SensorUnavailable,
    /// A trigger fired but no emergency contact with a phone number is set.
    NoValidContact,
    /// The alert payload could not be serialized.
    EncodeFailure,
    /// The peer could not be reached over the low-latency path.
    TransportUnreachable,
    /// Both the direct path and the store-and-forward path failed.
    TransportFailure,
    /// An inbound payload could not be decoded.
    DecodeFailure,
}

impl AlertError {
    /// Returns `true` when a fallback path exists for the condition.
    #[must_use]
    pub const fn has_fallback(self) -> bool {
        matches!(self, Self::TransportUnreachable)
    }

    /// Returns `true` when the user can retry the failed operation.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransportFailure | Self::TransportUnreachable)
    }

    /// Short machine-friendly label used by logs and transcripts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SensorUnavailable => "sensor-unavailable",
            Self::NoValidContact => "no-valid-contact",
            Self::EncodeFailure => "encode-failure",
            Self::TransportUnreachable => "transport-unreachable",
            Self::TransportFailure => "transport-failure",
            Self::DecodeFailure => "decode-failure",
        }
    }
}

impl fmt::Display for AlertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorUnavailable => f.write_str("motion sensor unavailable"),
            Self::NoValidContact => f.write_str("no emergency contact configured"),
            Self::EncodeFailure => f.write_str("alert payload could not be encoded"),
            Self::TransportUnreachable => f.write_str("companion unreachable"),
            Self::TransportFailure => f.write_str("alert delivery failed"),
            Self::DecodeFailure => f.write_str("inbound alert could not be decoded"),
        }
    }
}
