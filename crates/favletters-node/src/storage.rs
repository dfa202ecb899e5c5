//! Durable key/value store shared by every tab in a data directory.
//!
//! All values live in one JSON object (`state.json`). Writers take an
//! exclusive lock on `state.lock`, re-read, modify and atomically replace
//! the file, so concurrent tabs never clobber each other's keys.
//!
//! The lock is never waited on: a write that finds it held fails with
//! [`Error::Storage`] and the caller decides whether to skip it.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use favletters_core::TextStore;
use fs2::FileExt;
use tracing::debug;

use crate::error::{Error, Result};

const STATE_FILE: &str = "state.json";
const LOCK_FILE: &str = "state.lock";

/// File-backed storage.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Open or create storage in the given directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(STATE_FILE),
            lock_path: dir.join(LOCK_FILE),
        })
    }

    /// Path of the JSON state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a value.
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    /// Write a value. Fails without blocking if another writer holds the lock.
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock()?;

        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        let data = serde_json::to_vec_pretty(&values)?;
        self.write_atomic(&data)?;

        debug!(key, path = %self.path.display(), "stored value");
        Ok(())
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a temp file in the same dir, then rename over the target.
    fn write_atomic(&self, data: &[u8]) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(data)?;
        tmp.flush()?;
        tmp.persist(&self.path)?;
        Ok(())
    }

    fn lock(&self) -> Result<LockGuard> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)?;
        file.try_lock_exclusive().map_err(|_| {
            Error::Storage(format!(
                "{} is locked by another tab",
                self.lock_path.display()
            ))
        })?;
        Ok(LockGuard { _file: file })
    }
}

/// Exclusive lock, released on drop.
struct LockGuard {
    _file: fs::File,
}

impl TextStore for FileStore {
    fn get(&self, key: &str) -> favletters_core::Result<Option<String>> {
        Ok(self.read(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> favletters_core::Result<()> {
        Ok(self.write(key, value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();

        assert_eq!(store.read("favletters_text").unwrap(), None);
    }

    #[test]
    fn write_then_read() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();

        store.write("favletters_text", "ABC").unwrap();
        assert_eq!(store.read("favletters_text").unwrap().as_deref(), Some("ABC"));

        store.write("favletters_text", "").unwrap();
        assert_eq!(store.read("favletters_text").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn stores_in_same_dir_share_values() {
        let tmp = tempfile::tempdir().unwrap();
        let first = FileStore::open(tmp.path()).unwrap();
        let second = FileStore::open(tmp.path()).unwrap();

        first.write("a", "1").unwrap();
        second.write("b", "2").unwrap();

        assert_eq!(first.read("b").unwrap().as_deref(), Some("2"));
        assert_eq!(second.read("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn open_creates_nested_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let store = FileStore::open(&dir).unwrap();

        store.write("k", "v").unwrap();
        assert!(dir.join("state.json").is_file());
    }

    #[test]
    fn held_lock_fails_write_without_blocking() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        store.write("favletters_text", "OLD").unwrap();

        let other_tab = FileStore::open(tmp.path()).unwrap();
        let guard = other_tab.lock().unwrap();

        let err = store.write("favletters_text", "NEW").unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        // Readers are not blocked and see the previous value
        assert_eq!(store.read("favletters_text").unwrap().as_deref(), Some("OLD"));

        drop(guard);
        store.write("favletters_text", "NEW").unwrap();
        assert_eq!(store.read("favletters_text").unwrap().as_deref(), Some("NEW"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        fs::write(store.path(), b"{not json").unwrap();

        assert!(store.read("k").is_err());
        let mut as_text_store = store.clone();
        assert!(TextStore::get(&as_text_store, "k").is_err());
        assert!(TextStore::set(&mut as_text_store, "k", "v").is_err());
    }
}
