//! services/api/src/adapters/file_store.rs
//!
//! A `SlotStore` persisted as one JSON object on disk. Every write replaces the
//! file through a rename, so a crash never leaves a half-written record behind.
//! A write that fails to reach disk is rolled back in memory, so memory and
//! file never disagree about what is pending.
//!
//! Meant for small slot files: each write rewrites the whole object. On a
//! multi-threaded runtime the disk write runs through `block_in_place` so it
//! does not stall other tasks on the same worker.

use serde_json::Map;
use skincheck_core::ports::{PortError, PortResult, SlotStore};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{info, warn};

pub struct JsonFileStore {
    path: PathBuf,
    slots: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> PortResult<Self> {
        let path = path.as_ref().to_path_buf();
        let slots = match fs::read(&path) {
            Ok(raw) => parse_slots(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No slot file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| PortError::Unexpected("slot store lock poisoned".to_string()))
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> PortResult<()> {
        let json =
            serde_json::to_vec_pretty(slots).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        let write = || -> std::io::Result<()> {
            fs::write(&tmp, &json)?;
            fs::rename(&tmp, &self.path)
        };

        let on_worker_pool = Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        let written = if on_worker_pool {
            tokio::task::block_in_place(write)
        } else {
            write()
        };
        written.map_err(|e| {
            warn!("Failed to write slot file {}: {}", self.path.display(), e);
            PortError::Unexpected(e.to_string())
        })
    }

    /// Removes `key` and persists, putting the value back if the write fails.
    fn remove_persisted(&self, key: &str) -> PortResult<Option<String>> {
        let mut slots = self.lock()?;
        let Some(value) = slots.remove(key) else {
            return Ok(None);
        };
        if let Err(e) = self.persist(&slots) {
            slots.insert(key.to_string(), value);
            return Err(e);
        }
        Ok(Some(value))
    }
}

/// Non-string values are skipped instead of failing the whole file.
fn parse_slots(raw: &[u8]) -> PortResult<BTreeMap<String, String>> {
    let map: Map<String, serde_json::Value> =
        serde_json::from_slice(raw).map_err(|e| PortError::Unexpected(e.to_string()))?;
    Ok(map
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            _ => {
                warn!("Skipping non-string slot {}", key);
                None
            }
        })
        .collect())
}

impl SlotStore for JsonFileStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut slots = self.lock()?;
        let previous = slots.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&slots) {
            match previous {
                Some(previous) => slots.insert(key.to_string(), previous),
                None => slots.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn take(&self, key: &str) -> PortResult<Option<String>> {
        self.remove_persisted(key)
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.remove_persisted(key).map(|_| ())
    }
}
