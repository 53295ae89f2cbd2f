//! Generic key/value message envelope carried by both transports.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use super::WireError;

/// Maximum number of entries in one envelope.
pub const MAX_ENVELOPE_ENTRIES: usize = 8;

/// Maximum key length.
pub const MAX_ENVELOPE_KEY: usize = 16;

/// Maximum text value length.
pub const MAX_ENVELOPE_TEXT: usize = 64;

/// Maximum opaque blob length.
pub const MAX_ENVELOPE_BYTES: usize = 192;

/// Value stored under an envelope key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EnvelopeValue {
    Bytes(Vec<u8, MAX_ENVELOPE_BYTES>),
    Number(f64),
    Text(String<MAX_ENVELOPE_TEXT>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Entry {
    key: String<MAX_ENVELOPE_KEY>,
    value: EnvelopeValue,
}

/// Ordered, bounded dictionary exchanged between devices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    entries: Vec<Entry, MAX_ENVELOPE_ENTRIES>,
}

impl Envelope {
    /// Creates an empty envelope.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts or replaces the value under `key`.
    pub fn insert(&mut self, key: &str, value: EnvelopeValue) -> Result<(), WireError> {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            entry.value = value;
            return Ok(());
        }

        let key = String::try_from(key).map_err(|_| WireError::FieldTooLong)?;
        self.entries
            .push(Entry { key, value })
            .map_err(|_| WireError::EnvelopeFull)
    }

    /// Inserts a text value.
    pub fn insert_text(&mut self, key: &str, text: &str) -> Result<(), WireError> {
        let text = String::try_from(text).map_err(|_| WireError::FieldTooLong)?;
        self.insert(key, EnvelopeValue::Text(text))
    }

    /// Inserts a numeric value.
    pub fn insert_number(&mut self, key: &str, number: f64) -> Result<(), WireError> {
        self.insert(key, EnvelopeValue::Number(number))
    }

    /// Inserts an opaque blob.
    pub fn insert_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<(), WireError> {
        let bytes = Vec::from_slice(bytes).map_err(|_| WireError::FieldTooLong)?;
        self.insert(key, EnvelopeValue::Bytes(bytes))
    }

    pub fn get(&self, key: &str) -> Option<&EnvelopeValue> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn bytes(&self, key: &str) -> Option<&[u8]> {
        match self.get(key)? {
            EnvelopeValue::Bytes(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            EnvelopeValue::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            EnvelopeValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvelopeValue)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), &entry.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
