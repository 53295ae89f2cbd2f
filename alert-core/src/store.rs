//! Key/value persistence for contact, wearer, and history blobs.
//!
//! Each device keeps its state as independently keyed serialized blobs. The
//! [`KeyValueStore`] trait is the only persistence seam: the wrist keeps an
//! in-memory [`MemoryStore`], the emulator writes one file per key, and tests
//! use whichever is convenient.

use core::fmt;

use heapless::{String, Vec};
use serde::{Serialize, de::DeserializeOwned};

/// Maximum key length accepted by [`MemoryStore`].
pub const MAX_KEY_LEN: usize = 24;

/// Failure reported by a persistence backend.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoreError {
    /// No free slot remains for a new key.
    Full,
    /// The value does not fit in the backend or the caller's buffer.
    TooLarge,
    /// The stored blob could not be decoded or encoded.
    Corrupt,
    /// Backend I/O failed.
    Io,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("store full"),
            Self::TooLarge => f.write_str("value too large"),
            Self::Corrupt => f.write_str("stored value corrupt"),
            Self::Io => f.write_str("store i/o failure"),
        }
    }
}

/// Persistence backend addressed by fixed string keys.
pub trait KeyValueStore {
    /// Copies the value for `key` into `buf`, returning the filled prefix.
    ///
    /// Returns `Ok(None)` when the key has never been written or was removed.
    fn read<'b>(&self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, StoreError>;

    /// Replaces the value stored under `key`.
    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removes `key`; removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<T> KeyValueStore for &mut T
where
    T: KeyValueStore + ?Sized,
{
    fn read<'b>(&self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, StoreError> {
        (**self).read(key, buf)
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Serializes `value` with postcard into `scratch` and writes it under `key`.
pub fn save_record<S, T>(
    store: &mut S,
    key: &str,
    value: &T,
    scratch: &mut [u8],
) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    let encoded = postcard::to_slice(value, scratch).map_err(|_| StoreError::TooLarge)?;
    store.write(key, encoded)
}

/// Reads and decodes the postcard blob stored under `key`.
pub fn load_record<S, T>(store: &S, key: &str, scratch: &mut [u8]) -> Result<Option<T>, StoreError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    match store.read(key, scratch)? {
        Some(bytes) => postcard::from_bytes(bytes)
            .map(Some)
            .map_err(|_| StoreError::Corrupt),
        None => Ok(None),
    }
}

struct Slot<const BYTES: usize> {
    key: String<MAX_KEY_LEN>,
    value: Vec<u8, BYTES>,
}

/// Fixed-capacity RAM store with `SLOTS` keys of up to `BYTES` bytes each.
pub struct MemoryStore<const SLOTS: usize, const BYTES: usize> {
    slots: Vec<Slot<BYTES>, SLOTS>,
}

impl<const SLOTS: usize, const BYTES: usize> MemoryStore<SLOTS, BYTES> {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Returns `true` when a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.key.as_str() == key)
    }
}

impl<const SLOTS: usize, const BYTES: usize> Default for MemoryStore<SLOTS, BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOTS: usize, const BYTES: usize> KeyValueStore for MemoryStore<SLOTS, BYTES> {
    fn read<'b>(&self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, StoreError> {
        let Some(index) = self.position(key) else {
            return Ok(None);
        };

        let value = self.slots[index].value.as_slice();
        let target = buf.get_mut(..value.len()).ok_or(StoreError::TooLarge)?;
        target.copy_from_slice(value);
        Ok(Some(target))
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let value = Vec::from_slice(value).map_err(|_| StoreError::TooLarge)?;

        if let Some(index) = self.position(key) {
            self.slots[index].value = value;
            return Ok(());
        }

        let key = String::try_from(key).map_err(|_| StoreError::TooLarge)?;
        self.slots
            .push(Slot { key, value })
            .map_err(|_| StoreError::Full)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if let Some(index) = self.position(key) {
            self.slots.swap_remove(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_replaces_existing_value() {
        let mut store = MemoryStore::<2, 16>::new();
        store.write("wearerName", b"Ada").expect("first write");
        store.write("wearerName", b"Grace").expect("second write");

        let mut buf = [0u8; 16];
        let value = store
            .read("wearerName", &mut buf)
            .expect("read")
            .expect("value present");
        assert_eq!(value, b"Grace");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn full_store_rejects_new_keys() {
        let mut store = MemoryStore::<1, 8>::new();
        store.write("a", b"1").expect("first key");
        assert_eq!(store.write("b", b"2"), Err(StoreError::Full));
        assert_eq!(store.write("a", b"123456789"), Err(StoreError::TooLarge));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = MemoryStore::<2, 8>::new();
        store.write("alertHistory", b"x").expect("write");
        store.remove("alertHistory").expect("remove");
        store.remove("alertHistory").expect("remove again");

        let mut buf = [0u8; 8];
        assert_eq!(store.read("alertHistory", &mut buf), Ok(None));
    }

    #[test]
    fn records_round_trip_through_postcard() {
        let mut store = MemoryStore::<2, 32>::new();
        let mut scratch = [0u8; 32];
        save_record(&mut store, "pair", &(7u8, 1.5f64), &mut scratch).expect("save");

        let loaded: Option<(u8, f64)> = load_record(&store, "pair", &mut scratch).expect("load");
        assert_eq!(loaded, Some((7, 1.5)));
    }

    #[test]
    fn undecodable_records_report_corruption() {
        let mut store = MemoryStore::<2, 32>::new();
        store.write("pair", &[0xFF]).expect("write");

        let mut scratch = [0u8; 32];
        let loaded: Result<Option<(u8, f64)>, _> = load_record(&store, "pair", &mut scratch);
        assert_eq!(loaded, Err(StoreError::Corrupt));
    }
}
