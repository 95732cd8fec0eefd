//! ConfigStore trait - reactive settings source
//!
//! A key-value store with pull access to the current value and push notification on
//! change. Values are plain JSON.

use serde_json::Value;
use std::sync::Arc;

/// Settings namespace shared with the rest of the application
pub const SETTINGS_NAMESPACE: &str = "scoresight.json";

/// Change notification callback
///
/// Receives the new value. May be invoked from any thread.
pub type ChangeCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Reactive configuration store
pub trait ConfigStore: Send + Sync {
    /// Current value of a key, if set
    fn get(&self, namespace: &str, key: &str) -> Option<Value>;

    /// Register a callback invoked every time the key changes
    fn subscribe(&self, namespace: &str, key: &str, callback: ChangeCallback);

    /// Current value of a key, or `default` when unset
    fn fetch(&self, namespace: &str, key: &str, default: Value) -> Value {
        self.get(namespace, key).unwrap_or(default)
    }
}
