//! Persistent store adapter
//!
//! Durable key-value persistence of one [`InteractionRecord`] under a fixed
//! namespace key. Reads fail open to defaults and writes are best-effort:
//! losing telemetry must never break the page.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::current_time_ms;
use crate::error::{Result, TelemetryError};
use crate::record::InteractionRecord;

/// String key-value backend (the shape of `window.localStorage`)
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-memory backend for native hosts and tests.
///
/// Clones share the same underlying map, so a test can keep a handle and
/// inspect what the store wrote.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<BTreeMap<String, String>>>,
    reject_writes: Rc<Cell<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail like a full quota
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.set(reject);
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        if self.reject_writes.get() {
            return Err(TelemetryError::Storage("quota exceeded".to_string()));
        }
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Binds a backend to the namespace key holding the record
#[derive(Clone, Debug)]
pub struct InteractionStore<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> InteractionStore<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Load the record stamped with the current time
    pub fn load(&self) -> InteractionRecord {
        self.load_at(current_time_ms())
    }

    /// Load the record, treating an absent or malformed blob as a fresh
    /// profile. Never fails.
    pub fn load_at(&self, now_ms: u64) -> InteractionRecord {
        let raw = match self.try_load_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No stored interaction record, using defaults");
                return InteractionRecord::fresh(now_ms);
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read interaction record, using defaults");
                return InteractionRecord::fresh(now_ms);
            }
        };

        match InteractionRecord::merge_from_json(&raw, now_ms) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Discarding malformed interaction record");
                InteractionRecord::fresh(now_ms)
            }
        }
    }

    /// Overwrite the stored blob. Failures are logged and swallowed.
    pub fn save(&self, record: &InteractionRecord) {
        if let Err(e) = self.try_save(record) {
            warn!(key = %self.key, error = %e, "Failed to persist interaction record");
        }
    }

    pub fn try_load_raw(&self) -> Result<Option<String>> {
        self.backend.get_item(&self.key)
    }

    pub fn try_save(&self, record: &InteractionRecord) -> Result<()> {
        let json = record.to_json()?;
        self.backend.set_item(&self.key, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STORAGE_KEY;
    use crate::record::SkillHover;

    /// Backend whose reads always fail
    struct BrokenStorage;

    impl KeyValueStore for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(TelemetryError::StorageUnavailable("access denied".into()))
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(TelemetryError::StorageUnavailable("access denied".into()))
        }
        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    fn store() -> (MemoryStorage, InteractionStore<MemoryStorage>) {
        let backend = MemoryStorage::new();
        let store = InteractionStore::new(backend.clone(), DEFAULT_STORAGE_KEY);
        (backend, store)
    }

    #[test]
    fn test_fresh_profile_loads_defaults() {
        let (_, store) = store();
        let record = store.load_at(1234);

        assert!(record.section_visit_counts.is_empty());
        assert!(record.skill_hover_counts.is_empty());
        assert!(!record.is_sound_enabled);
        assert!(!record.is_ghostline_full_mode_unlocked);
        assert_eq!(record.last_visit_timestamp, 1234);
    }

    #[test]
    fn test_malformed_blob_loads_defaults() {
        let (backend, store) = store();
        backend.set_item(DEFAULT_STORAGE_KEY, "{\"sectionVisitCounts\": ").unwrap();
        assert_eq!(store.load_at(5), InteractionRecord::fresh(5));

        backend.set_item(DEFAULT_STORAGE_KEY, "\"just a string\"").unwrap();
        assert_eq!(store.load_at(6), InteractionRecord::fresh(6));
    }

    #[test]
    fn test_unreadable_backend_loads_defaults() {
        let store = InteractionStore::new(BrokenStorage, "k");
        assert_eq!(store.load_at(9), InteractionRecord::fresh(9));
        // Swallowed
        store.save(&InteractionRecord::default());
        assert!(store.try_save(&InteractionRecord::default()).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let (_, store) = store();
        let mut record = InteractionRecord::fresh(10);
        record.section_visit_counts.insert("about".into(), 3);
        record.skill_hover_counts.insert("rust".into(), SkillHover { count: 2, last_timestamp: 8 });
        record.is_ghostline_mode_enabled = true;
        store.save(&record);

        let loaded = store.load_at(10);
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_load_then_save_is_byte_identical() {
        let (backend, store) = store();
        let stored = r#"{"sectionVisitCounts":{"about":1,"home":4},"skillHoverCounts":{"python":{"count":3,"lastTimestamp":1000}},"isSoundEnabled":true,"isGhostlineModeEnabled":false,"isGhostlineFullModeUnlocked":false,"fastScrollCount":2,"lastVisitTimestamp":77,"zLegacy":[1]}"#;
        backend.set_item(DEFAULT_STORAGE_KEY, stored).unwrap();

        store.save(&store.load_at(77));
        assert_eq!(backend.get_item(DEFAULT_STORAGE_KEY).unwrap().unwrap(), stored);
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let (backend, store) = store();
        backend.set_reject_writes(true);
        store.save(&InteractionRecord::fresh(1));
        assert!(backend.is_empty());
    }
}
