//! Key/value persistence and the recent-search list kept in it.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, WeatherError},
    model::Location,
};

/// Storage key of the serialized recent-search list.
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

/// Number of locations remembered.
pub const MAX_RECENT_SEARCHES: usize = 5;

/// String values stored by string key.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// One file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WeatherError::StorageUnavailable(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            WeatherError::StorageUnavailable(format!(
                "failed to create {}: {e}",
                self.dir.display()
            ))
        })?;

        let path = self.path_for(key);
        fs::write(&path, value).map_err(|e| {
            WeatherError::StorageUnavailable(format!("failed to write {}: {e}", path.display()))
        })
    }
}

/// Process-local store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| WeatherError::StorageUnavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| WeatherError::StorageUnavailable(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Most-recent-first list of unique places (by name and country).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecentSearches(Vec<Location>);

impl RecentSearches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the list from `store`. Unreadable or corrupt data is logged and
    /// treated as an empty list.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(RECENT_SEARCHES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                tracing::warn!(error = %e, "recent searches unavailable");
                return Self::new();
            }
        };

        match serde_json::from_str::<Vec<Location>>(&raw) {
            Ok(mut list) => {
                list.truncate(MAX_RECENT_SEARCHES);
                Self(list)
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding corrupt recent searches");
                Self::new()
            }
        }
    }

    /// Writes the list to `store`; failures are logged and swallowed.
    pub fn save(&self, store: &dyn KeyValueStore) {
        let result = serde_json::to_string(&self.0)
            .map_err(WeatherError::from)
            .and_then(|json| store.set(RECENT_SEARCHES_KEY, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to persist recent searches");
        }
    }

    /// Moves `location` to the front, dropping any older entry for the same
    /// place and anything beyond the cap.
    pub fn remember(&mut self, location: Location) {
        self.0.retain(|l| !l.same_place(&location));
        self.0.insert(0, location);
        self.0.truncate(MAX_RECENT_SEARCHES);
    }

    pub fn as_slice(&self) -> &[Location] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
