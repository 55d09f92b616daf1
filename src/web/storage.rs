use tracing::warn;

use super::js_error;
use crate::error::{Result, TelemetryError};
use crate::store::{KeyValueStore, MemoryStorage};

/// `window.localStorage`
#[derive(Clone, Debug)]
pub struct BrowserStorage {
    storage: web_sys::Storage,
}

impl BrowserStorage {
    pub fn local() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| TelemetryError::StorageUnavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| TelemetryError::StorageUnavailable(js_error(&e)))?
            .ok_or_else(|| TelemetryError::StorageUnavailable("localStorage is null".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| TelemetryError::Storage(js_error(&e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| TelemetryError::Storage(js_error(&e)))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| TelemetryError::Storage(js_error(&e)))
    }
}

/// `localStorage` when the page may use it, otherwise session-only memory
#[derive(Clone, Debug)]
pub enum PageStorage {
    Browser(BrowserStorage),
    Memory(MemoryStorage),
}

impl PageStorage {
    pub fn detect() -> Self {
        match BrowserStorage::local() {
            Ok(storage) => PageStorage::Browser(storage),
            Err(e) => {
                warn!(error = %e, "localStorage unavailable, interactions kept for this session only");
                PageStorage::Memory(MemoryStorage::new())
            }
        }
    }
}

impl KeyValueStore for PageStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self {
            PageStorage::Browser(s) => s.get_item(key),
            PageStorage::Memory(s) => s.get_item(key),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        match self {
            PageStorage::Browser(s) => s.set_item(key, value),
            PageStorage::Memory(s) => s.set_item(key, value),
        }
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match self {
            PageStorage::Browser(s) => s.remove_item(key),
            PageStorage::Memory(s) => s.remove_item(key),
        }
    }
}
