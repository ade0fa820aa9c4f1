use std::collections::BTreeMap;
use std::sync::Arc;

use outreach_core::{upsert_entry, ConfigEntry, LOCAL_CREDENTIAL_KEYS};
use outreach_logging::{outreach_debug, outreach_error, outreach_warn};

use crate::storage::{CacheStorage, MemoryStorage};

/// Storage key of the mirrored config list.
pub const CONFIG_STORAGE_KEY: &str = "sns_web_configs";

/// Best-effort local mirror of named configs.
///
/// Every operation is infallible from the caller's point of view: unreadable
/// or corrupt storage reads as empty, and failed writes are logged and dropped.
#[derive(Clone)]
pub struct LocalConfigCache {
    storage: Arc<dyn CacheStorage>,
}

impl LocalConfigCache {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn entries(&self) -> Vec<ConfigEntry> {
        let blob = match self.storage.read(CONFIG_STORAGE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Vec::new(),
            Err(err) => {
                outreach_warn!("Failed to read cached configs: {}", err);
                return Vec::new();
            }
        };

        match serde_json::from_str(&blob) {
            Ok(entries) => entries,
            Err(err) => {
                outreach_warn!("Cached configs are corrupt, treating as empty: {}", err);
                Vec::new()
            }
        }
    }

    pub fn entry(&self, key: &str) -> Option<ConfigEntry> {
        self.entries().into_iter().find(|entry| entry.key == key)
    }

    /// Value for `key`; empty strings read as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entry(key)
            .and_then(|entry| entry.value)
            .filter(|value| !value.is_empty())
    }

    /// Sets a value, keeping any description already cached for the key.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut entries = self.entries();
        let description = entries
            .iter()
            .find(|entry| entry.key == key)
            .and_then(|entry| entry.description.clone());
        upsert_entry(
            &mut entries,
            ConfigEntry::new(key, Some(value.into())).with_description(description),
        );
        self.save(&entries);
    }

    pub fn upsert(&self, entry: ConfigEntry) {
        let mut entries = self.entries();
        upsert_entry(&mut entries, entry);
        self.save(&entries);
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|entry| entry.key != key);
        if entries.len() != before {
            self.save(&entries);
        }
    }

    pub fn replace_all(&self, entries: &[ConfigEntry]) {
        self.save(entries);
    }

    /// Mirrors a full server listing. Local credentials the listing does not
    /// carry are kept; every other key not in the listing is dropped.
    pub fn refresh_mirror(&self, server: &[ConfigEntry]) {
        let mut entries = server.to_vec();
        for kept in self.entries().into_iter().filter(|entry| {
            LOCAL_CREDENTIAL_KEYS.contains(&entry.key.as_str())
                && !server.iter().any(|listed| listed.key == entry.key)
        }) {
            entries.push(kept);
        }
        self.save(&entries);
    }

    pub fn get_all(&self) -> BTreeMap<String, Option<String>> {
        self.entries()
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect()
    }

    fn save(&self, entries: &[ConfigEntry]) {
        let blob = match serde_json::to_string(entries) {
            Ok(blob) => blob,
            Err(err) => {
                outreach_error!("Failed to serialize cached configs: {}", err);
                return;
            }
        };
        match self.storage.write(CONFIG_STORAGE_KEY, &blob) {
            Ok(()) => outreach_debug!("Cached {} config entries", entries.len()),
            Err(err) => outreach_error!("Failed to write cached configs: {}", err),
        }
    }
}

impl std::fmt::Debug for LocalConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalConfigCache").finish_non_exhaustive()
    }
}
