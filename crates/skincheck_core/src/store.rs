//! crates/skincheck_core/src/store.rs
//!
//! In-process `SlotStore` implementations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ports::{PortError, PortResult, SlotStore};

/// A `SlotStore` held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| PortError::Unexpected("slot store lock poisoned".to_string()))
    }
}

impl SlotStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn take(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.remove(key))
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Prefixes every key so several sessions can share one backing store.
#[derive(Clone)]
pub struct NamespacedStore {
    inner: Arc<dyn SlotStore>,
    prefix: String,
}

impl NamespacedStore {
    pub fn new(inner: Arc<dyn SlotStore>, namespace: impl AsRef<str>) -> Self {
        Self {
            inner,
            prefix: format!("{}:", namespace.as_ref()),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl SlotStore for NamespacedStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        self.inner.get(&self.key(key))
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.inner.set(&self.key(key), value)
    }

    fn take(&self, key: &str) -> PortResult<Option<String>> {
        self.inner.take(&self.key(key))
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.inner.remove(&self.key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_removes_the_value() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.take("k").unwrap().as_deref(), Some("v"));
        assert_eq!(store.take("k").unwrap(), None);
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn namespaces_do_not_collide() {
        let backing: Arc<dyn SlotStore> = Arc::new(MemoryStore::new());
        let a = NamespacedStore::new(backing.clone(), "a");
        let b = NamespacedStore::new(backing.clone(), "b");

        a.set("lastAnalysis", "one").unwrap();
        b.set("lastAnalysis", "two").unwrap();

        assert_eq!(a.get("lastAnalysis").unwrap().as_deref(), Some("one"));
        assert_eq!(b.take("lastAnalysis").unwrap().as_deref(), Some("two"));
        assert_eq!(a.get("lastAnalysis").unwrap().as_deref(), Some("one"));
        assert_eq!(backing.get("a:lastAnalysis").unwrap().as_deref(), Some("one"));
    }
}
