//! Reactive settings stores
//!
//! - `MemoryStore`: in-process pub/sub, used by tests and embedders
//! - `JsonFileStore`: one JSON object file per namespace, reloadable from disk
//!
//! Callbacks are always invoked after internal locks are released, so a callback may
//! read the store again.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use contracts::{ChangeCallback, ConfigStore, ContractError};
use serde_json::{Map, Value};
use tracing::{debug, warn};

type Key = (String, String);

fn key(namespace: &str, key: &str) -> Key {
    (namespace.to_string(), key.to_string())
}

/// Callbacks per (namespace, key)
#[derive(Default)]
struct Subscribers {
    callbacks: Mutex<HashMap<Key, Vec<ChangeCallback>>>,
}

impl Subscribers {
    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Vec<ChangeCallback>>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, namespace: &str, name: &str, callback: ChangeCallback) {
        self.lock()
            .entry(key(namespace, name))
            .or_default()
            .push(callback);
    }

    fn notify(&self, namespace: &str, name: &str, value: &Value) {
        let callbacks = self
            .lock()
            .get(&key(namespace, name))
            .cloned()
            .unwrap_or_default();

        debug!(
            namespace,
            key = name,
            subscribers = callbacks.len(),
            "Settings value changed"
        );
        for callback in callbacks {
            callback(value);
        }
    }
}

/// In-memory reactive store
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<Key, Value>>,
    subscribers: Subscribers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, notifying subscribers when it changed
    pub fn set(&self, namespace: &str, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let previous = self
            .values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key(namespace, name), value.clone());

        if previous.as_ref() != Some(&value) {
            self.subscribers.notify(namespace, name, &value);
        }
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, namespace: &str, name: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key(namespace, name))
            .cloned()
    }

    fn subscribe(&self, namespace: &str, name: &str, callback: ChangeCallback) {
        self.subscribers.add(namespace, name, callback);
    }
}

/// JSON-file backed reactive store
///
/// Namespace `scoresight.json` lives at `<dir>/scoresight.json`. A missing file is an
/// empty namespace. External edits become visible through `reload()`.
pub struct JsonFileStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, Map<String, Value>>>,
    /// Namespaces with subscribers, reloaded even if their first load failed
    watched: Mutex<HashSet<String>>,
    subscribers: Subscribers,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ContractError> {
        let dir = dir.into();
        if dir.exists() && !dir.is_dir() {
            return Err(ContractError::store(
                dir.display().to_string(),
                "settings path is not a directory",
            ));
        }

        Ok(Self {
            dir,
            cache: RwLock::new(HashMap::new()),
            watched: Mutex::new(HashSet::new()),
            subscribers: Subscribers::default(),
        })
    }

    /// Settings directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Set a value, persist the namespace file and notify subscribers when it changed
    pub fn set(
        &self,
        namespace: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ContractError> {
        let value = value.into();
        self.ensure_loaded(namespace)?;

        let changed = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            let mut entries = cache.get(namespace).cloned().unwrap_or_default();
            let previous = entries.insert(name.to_string(), value.clone());
            self.write_namespace(namespace, &entries)?;
            cache.insert(namespace.to_string(), entries);
            previous.as_ref() != Some(&value)
        };

        if changed {
            self.subscribers.notify(namespace, name, &value);
        }
        Ok(())
    }

    /// Re-read every loaded or subscribed namespace from disk
    ///
    /// Subscribers are notified for each added or modified key. Returns the number of
    /// changed keys. On a read or parse failure the cached values are kept.
    pub fn reload(&self) -> Result<usize, ContractError> {
        let mut namespaces: HashSet<String> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        namespaces.extend(
            self.watched
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .cloned(),
        );

        let mut changes = Vec::new();
        for namespace in namespaces {
            let fresh = self.read_namespace(&namespace)?;
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            let current = cache.entry(namespace.clone()).or_default();

            for (name, value) in &fresh {
                if current.get(name) != Some(value) {
                    changes.push((namespace.clone(), name.clone(), value.clone()));
                }
            }
            for name in current.keys().filter(|name| !fresh.contains_key(*name)) {
                debug!(namespace = %namespace, key = %name, "Settings key removed");
            }
            *current = fresh;
        }

        for (namespace, name, value) in &changes {
            self.subscribers.notify(namespace, name, value);
        }
        Ok(changes.len())
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(namespace)
    }

    fn ensure_loaded(&self, namespace: &str) -> Result<(), ContractError> {
        if self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(namespace)
        {
            return Ok(());
        }

        let entries = self.read_namespace(namespace)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(namespace.to_string())
            .or_insert(entries);
        Ok(())
    }

    fn read_namespace(&self, namespace: &str) -> Result<Map<String, Value>, ContractError> {
        let path = self.path_for(namespace);
        if !path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => Ok(entries),
            Ok(_) => Err(ContractError::store(namespace, "settings file is not a JSON object")),
            Err(e) => Err(ContractError::store(namespace, format!("JSON parse error: {e}"))),
        }
    }

    fn write_namespace(
        &self,
        namespace: &str,
        entries: &Map<String, Value>,
    ) -> Result<(), ContractError> {
        fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| ContractError::store(namespace, format!("JSON serialize error: {e}")))?;

        let path = self.path_for(namespace);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, namespace: &str, name: &str) -> Option<Value> {
        if let Err(e) = self.ensure_loaded(namespace) {
            warn!(namespace, error = %e, "Failed to load settings namespace");
            return None;
        }
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .and_then(|entries| entries.get(name))
            .cloned()
    }

    fn subscribe(&self, namespace: &str, name: &str, callback: ChangeCallback) {
        // Load now so the next reload has a baseline to diff against
        if let Err(e) = self.ensure_loaded(namespace) {
            warn!(namespace, error = %e, "Failed to load settings namespace");
        }
        self.watched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(namespace.to_string());
        self.subscribers.add(namespace, name, callback);
    }
}
