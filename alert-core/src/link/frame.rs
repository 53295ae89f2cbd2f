//! Byte framing between the wrist MCU and its radio module.
//!
//! ```text
//! 0xA5 | kind u8 | len u16 BE | payload[len] | xor(kind, len, payload)
//! ```

use core::fmt;

use heapless::Vec;
use winnow::ModalResult;
use winnow::binary::{be_u16, length_take};
use winnow::prelude::*;
use winnow::token::any;

pub const FRAME_SYNC: u8 = 0xA5;
pub const MAX_FRAME_PAYLOAD: usize = 512;

/// Sync, kind, and length bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest encoded frame.
pub const MAX_FRAME_LEN: usize = FRAME_HEADER_LEN + MAX_FRAME_PAYLOAD + 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum FrameKind {
    /// Wrist to radio: interactive message carrying an envelope.
    Message = 0x01,
    /// Radio to wrist: the peer's reply envelope.
    Reply = 0x02,
    /// Radio to wrist: the interactive message could not be delivered.
    SendFailed = 0x03,
    /// Wrist to radio: durable store-and-forward payload.
    Transfer = 0x04,
    TransferQueued = 0x05,
    TransferFailed = 0x06,
    LinkStatus = 0x10,
    Location = 0x11,
    TimeSync = 0x12,
    /// Contact settings pushed from the companion.
    Configure = 0x13,
}

impl TryFrom<u8> for FrameKind {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => Self::Message,
            0x02 => Self::Reply,
            0x03 => Self::SendFailed,
            0x04 => Self::Transfer,
            0x05 => Self::TransferQueued,
            0x06 => Self::TransferFailed,
            0x10 => Self::LinkStatus,
            0x11 => Self::Location,
            0x12 => Self::TimeSync,
            0x13 => Self::Configure,
            other => return Err(FrameError::UnknownKind(other)),
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameError {
    /// Payload longer than [`MAX_FRAME_PAYLOAD`].
    TooLarge,
    /// Output buffer cannot hold the encoded frame.
    BufferTooSmall,
    UnknownKind(u8),
    Checksum,
    Malformed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge => f.write_str("frame payload too large"),
            Self::BufferTooSmall => f.write_str("frame buffer too small"),
            Self::UnknownKind(kind) => write!(f, "unknown frame kind 0x{kind:02x}"),
            Self::Checksum => f.write_str("frame checksum mismatch"),
            Self::Malformed => f.write_str("malformed frame"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    kind: FrameKind,
    payload: Vec<u8, MAX_FRAME_PAYLOAD>,
}

impl Frame {
    pub fn new(kind: FrameKind, payload: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            kind,
            payload: Vec::from_slice(payload).map_err(|_| FrameError::TooLarge)?,
        })
    }

    pub fn empty(kind: FrameKind) -> Self {
        Self {
            kind,
            payload: Vec::new(),
        }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Writes the framed bytes into `out` and returns the encoded length.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.payload.len();
        let total = FRAME_HEADER_LEN + len + 1;
        let out = out.get_mut(..total).ok_or(FrameError::BufferTooSmall)?;
        let len_bytes = u16::try_from(len)
            .map_err(|_| FrameError::TooLarge)?
            .to_be_bytes();

        out[0] = FRAME_SYNC;
        out[1] = self.kind as u8;
        out[2..FRAME_HEADER_LEN].copy_from_slice(&len_bytes);
        out[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len].copy_from_slice(&self.payload);
        out[total - 1] = checksum(self.kind as u8, len_bytes, &self.payload);
        Ok(total)
    }
}

struct RawFrame<'i> {
    kind: u8,
    len_bytes: [u8; 2],
    payload: &'i [u8],
    checksum: u8,
}

fn raw_frame<'i>(input: &mut &'i [u8]) -> ModalResult<RawFrame<'i>> {
    let (_, kind, payload, checksum) = (
        any.verify(|byte: &u8| *byte == FRAME_SYNC),
        any,
        length_take(be_u16),
        any,
    )
        .parse_next(input)?;

    let len_bytes = u16::try_from(payload.len())
        .unwrap_or(u16::MAX)
        .to_be_bytes();
    Ok(RawFrame {
        kind,
        len_bytes,
        payload,
        checksum,
    })
}

/// Decodes exactly one complete frame.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, FrameError> {
    let raw = raw_frame
        .parse(bytes)
        .map_err(|_| FrameError::Malformed)?;

    if checksum(raw.kind, raw.len_bytes, raw.payload) != raw.checksum {
        return Err(FrameError::Checksum);
    }
    Frame::new(FrameKind::try_from(raw.kind)?, raw.payload)
}

fn checksum(kind: u8, len_bytes: [u8; 2], payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(kind ^ len_bytes[0] ^ len_bytes[1], |acc, byte| acc ^ byte)
}

/// Reassembles frames from an unaligned byte stream.
///
/// Bytes before a sync marker are discarded. A corrupt candidate costs only
/// its sync byte, so a real frame hidden behind it is still found.
#[derive(Clone, Debug, Default)]
pub struct FrameAccumulator<const N: usize = { MAX_FRAME_LEN * 2 }> {
    buffer: Vec<u8, N>,
    discarded: usize,
}

impl<const N: usize> FrameAccumulator<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarded: 0,
        }
    }

    /// Appends received bytes; on overflow the buffered bytes are dropped first.
    pub fn push(&mut self, bytes: &[u8]) {
        for byte in bytes {
            if self.buffer.push(*byte).is_err() {
                self.discarded += self.buffer.len();
                self.buffer.clear();
                let _ = self.buffer.push(*byte);
            }
        }
    }

    /// Number of bytes thrown away while resynchronising.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Extracts the next complete frame, if one is buffered.
    pub fn next_frame(&mut self) -> Option<Result<Frame, FrameError>> {
        let Some(start) = self.buffer.iter().position(|byte| *byte == FRAME_SYNC) else {
            self.drain(self.buffer.len());
            return None;
        };
        self.drain(start);

        if self.buffer.len() < FRAME_HEADER_LEN {
            return None;
        }

        let len = usize::from(u16::from_be_bytes([self.buffer[2], self.buffer[3]]));
        if len > MAX_FRAME_PAYLOAD {
            self.drain(1);
            return Some(Err(FrameError::TooLarge));
        }

        let total = FRAME_HEADER_LEN + len + 1;
        if self.buffer.len() < total {
            return None;
        }

        let result = decode_frame(&self.buffer[..total]);
        match result {
            Ok(_) | Err(FrameError::UnknownKind(_)) => self.consume(total),
            Err(_) => self.drain(1),
        }
        Some(result)
    }

    fn consume(&mut self, count: usize) {
        let count = count.min(self.buffer.len());
        let remaining = self.buffer.len() - count;
        self.buffer.copy_within(count.., 0);
        self.buffer.truncate(remaining);
    }

    fn drain(&mut self, count: usize) {
        self.discarded += count.min(self.buffer.len());
        self.consume(count);
    }
}
