//! One-file-per-key persistence for the emulated devices.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;

use alert_core::store::{KeyValueStore, StoreError};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) the directory backing this store.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.bin"))
    }
}

impl KeyValueStore for FileStore {
    fn read<'b>(&self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b [u8]>, StoreError> {
        let bytes = match fs::read(self.path(key)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(_) => return Err(StoreError::Io),
        };

        let target = buf.get_mut(..bytes.len()).ok_or(StoreError::TooLarge)?;
        target.copy_from_slice(&bytes);
        Ok(Some(target))
    }

    fn write(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        fs::write(self.path(key), value).map_err(|_| StoreError::Io)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(_) => Err(StoreError::Io),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "wristguard-store-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn values_survive_reopen() {
        let dir = scratch_dir("reopen");
        let mut store = FileStore::open(&dir).expect("open");
        store.write("wearerName", b"Ada").expect("write");

        let reopened = FileStore::open(&dir).expect("reopen");
        let mut buf = [0u8; 16];
        assert_eq!(
            reopened.read("wearerName", &mut buf).expect("read"),
            Some(&b"Ada"[..])
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_and_removed_keys_read_as_none() {
        let dir = scratch_dir("remove");
        let mut store = FileStore::open(&dir).expect("open");
        let mut buf = [0u8; 8];
        assert_eq!(store.read("alertHistory", &mut buf), Ok(None));

        store.write("alertHistory", b"1234").expect("write");
        store.remove("alertHistory").expect("remove");
        store.remove("alertHistory").expect("remove twice");
        assert_eq!(store.read("alertHistory", &mut buf), Ok(None));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn oversized_value_is_rejected() {
        let dir = scratch_dir("large");
        let mut store = FileStore::open(&dir).expect("open");
        store.write("emergencyContact", &[7u8; 32]).expect("write");

        let mut buf = [0u8; 4];
        assert_eq!(
            store.read("emergencyContact", &mut buf),
            Err(StoreError::TooLarge)
        );
        let _ = fs::remove_dir_all(dir);
    }
}
