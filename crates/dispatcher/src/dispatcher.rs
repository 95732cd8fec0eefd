//! Dispatcher - filters detection batches and relays mapped fields

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use contracts::{
    CommandSender, ConfigStore, DetectionResult, FieldFormatters, FieldMapping, RelayBlueprint,
    ResultState, SendOutcome, SETTINGS_NAMESPACE,
};
use observability::{record_delivery, record_format_fallback, DeliveryAggregator, DeliverySummary};

use crate::formatter::format_value;
use crate::metrics::{DispatchMetrics, MetricsSnapshot};
use crate::payload::{build_payload, PayloadShape};

/// Forward `SameNoChange` results too
pub const KEY_SEND_SAME: &str = "uno_send_same";
/// Use the essentials payload shape
pub const KEY_ESSENTIALS: &str = "uno_essentials";
/// Session id for the essentials payload shape
pub const KEY_ESSENTIALS_ID: &str = "uno_essentials_id";
/// Endpoint URL
pub const KEY_ENDPOINT: &str = "uno_url";

/// Scalar dispatcher settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Endpoint receiving the PUT requests
    pub endpoint: String,
    /// Republish `SameNoChange` results
    pub update_same: bool,
    /// Address overlay fields by `fieldId` + `id`
    pub essentials_mode: bool,
    /// Session id used in essentials mode
    pub essentials_id: String,
}

impl DispatcherConfig {
    /// Whether results in `state` are relayed
    pub fn is_eligible(&self, state: ResultState) -> bool {
        match state {
            ResultState::Success => true,
            ResultState::SameNoChange => self.update_same,
            _ => false,
        }
    }

    pub fn payload_shape(&self) -> PayloadShape {
        PayloadShape::from_mode(self.essentials_mode, &self.essentials_id)
    }
}

/// Configuration as seen by one `update()` call
#[derive(Debug, Clone, Default)]
struct LiveConfig {
    settings: DispatcherConfig,
    mapping: Arc<FieldMapping>,
    formatters: Arc<FieldFormatters>,
}

#[derive(Debug, Default)]
struct Shared {
    running: AtomicBool,
    config: RwLock<LiveConfig>,
    metrics: DispatchMetrics,
    deliveries: Mutex<DeliveryAggregator>,
}

impl Shared {
    fn snapshot(&self) -> LiveConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn modify(&self, apply: impl FnOnce(&mut LiveConfig)) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut config);
    }

    /// Apply one reactive setting
    ///
    /// Values of the wrong JSON type are ignored.
    fn apply_setting(&self, key: &str, value: &Value) {
        let applied = match key {
            KEY_SEND_SAME => value
                .as_bool()
                .map(|flag| self.modify(|c| c.settings.update_same = flag)),
            KEY_ESSENTIALS => value
                .as_bool()
                .map(|flag| self.modify(|c| c.settings.essentials_mode = flag)),
            KEY_ESSENTIALS_ID => value
                .as_str()
                .map(|id| self.modify(|c| c.settings.essentials_id = id.to_string())),
            KEY_ENDPOINT => value
                .as_str()
                .map(|url| self.modify(|c| c.settings.endpoint = url.to_string())),
            _ => None,
        };

        match applied {
            Some(()) => debug!(key, value = %value, "Setting applied"),
            None => warn!(key, value = %value, "Ignoring setting with unexpected type"),
        }
    }
}

/// Relays mapped detection results to an endpoint
///
/// Starts stopped. Configuration may change at any time from any thread; each `update()`
/// works on one consistent snapshot of it.
pub struct Dispatcher<S> {
    sender: S,
    shared: Arc<Shared>,
}

impl<S: CommandSender> Dispatcher<S> {
    /// Create a stopped dispatcher with empty mapping
    pub fn new(sender: S, endpoint: impl Into<String>) -> Self {
        let dispatcher = Self {
            sender,
            shared: Arc::new(Shared::default()),
        };
        dispatcher.set_endpoint(endpoint);
        dispatcher
    }

    /// Create a stopped dispatcher from a relay configuration
    pub fn from_blueprint(sender: S, blueprint: &RelayBlueprint) -> Self {
        let dispatcher = Self::new(sender, blueprint.endpoint.clone());
        dispatcher.set_field_mapping(blueprint.field_mapping.clone());
        dispatcher.set_field_formatters(blueprint.field_formatters.clone());
        dispatcher
    }

    pub fn start(&self) {
        if !self.shared.running.swap(true, Ordering::SeqCst) {
            info!(sender = self.sender.name(), "Dispatcher started");
        }
    }

    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            info!(sender = self.sender.name(), "Dispatcher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn set_field_mapping(&self, mapping: FieldMapping) {
        debug!(fields = mapping.len(), "Setting field mapping");
        let mapping = Arc::new(mapping);
        self.shared.modify(|c| c.mapping = mapping);
    }

    pub fn set_field_formatters(&self, formatters: FieldFormatters) {
        debug!(formatters = formatters.len(), "Setting field formatters");
        let formatters = Arc::new(formatters);
        self.shared.modify(|c| c.formatters = formatters);
    }

    pub fn set_endpoint(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        self.shared.modify(|c| c.settings.endpoint = endpoint);
    }

    pub fn set_update_same(&self, update_same: bool) {
        self.shared.modify(|c| c.settings.update_same = update_same);
    }

    pub fn set_essentials_mode(&self, essentials_mode: bool) {
        self.shared.modify(|c| c.settings.essentials_mode = essentials_mode);
    }

    pub fn set_essentials_id(&self, essentials_id: impl Into<String>) {
        let essentials_id = essentials_id.into();
        self.shared.modify(|c| c.settings.essentials_id = essentials_id);
    }

    /// Current scalar settings
    pub fn config(&self) -> DispatcherConfig {
        self.shared.snapshot().settings
    }

    /// Load the reactive settings from `store` and follow their changes
    ///
    /// Unset keys keep their current value. Subscriptions end when the dispatcher is
    /// dropped.
    #[instrument(name = "dispatcher_bind", skip(self, store))]
    pub fn bind(&self, store: &dyn ConfigStore) {
        for key in [KEY_SEND_SAME, KEY_ESSENTIALS, KEY_ESSENTIALS_ID, KEY_ENDPOINT] {
            if let Some(value) = store.get(SETTINGS_NAMESPACE, key) {
                self.shared.apply_setting(key, &value);
            }

            let shared: Weak<Shared> = Arc::downgrade(&self.shared);
            store.subscribe(
                SETTINGS_NAMESPACE,
                key,
                Arc::new(move |value: &Value| {
                    if let Some(shared) = shared.upgrade() {
                        shared.apply_setting(key, value);
                    }
                }),
            );
        }
    }

    /// Relay one detection batch
    ///
    /// Results are processed in order, one request at a time. Delivery problems are
    /// logged per field and never returned.
    #[instrument(
        name = "dispatcher_update",
        skip(self, results),
        fields(results = results.len())
    )]
    pub async fn update(&self, results: &[DetectionResult]) {
        if !self.is_running() {
            return;
        }

        let config = self.shared.snapshot();
        if config.mapping.is_empty() {
            debug!("Field mapping is not set");
            return;
        }

        for result in results {
            let command = match config.mapping.get(&result.name) {
                Some(command) if config.settings.is_eligible(result.state) => command,
                _ => {
                    self.shared.metrics.inc_skipped();
                    continue;
                }
            };

            if !self.is_running() {
                debug!("Dispatcher stopped during batch");
                return;
            }

            self.dispatch(&config, result, command).await;
        }
    }

    async fn dispatch(&self, config: &LiveConfig, result: &DetectionResult, command: &str) {
        let formatted = format_value(&result.name, &result.value, command, &config.formatters);
        if formatted.fell_back {
            self.shared.metrics.inc_format_fallbacks();
            record_format_fallback(&result.name);
        }

        let payload = build_payload(
            command,
            formatted.value,
            formatted.payload_override,
            &config.settings.payload_shape(),
        );

        let started = Instant::now();
        let outcome = self.sender.send(&config.settings.endpoint, &payload).await;
        let latency = started.elapsed();

        if let SendOutcome::Delivered { .. } = outcome {
            debug!(field = %result.name, command, "Field relayed");
        }

        self.shared.metrics.record_outcome(&outcome);
        record_delivery(&result.name, &outcome, latency);
        self.shared
            .deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update(&result.name, &outcome, latency);
    }

    /// Get dispatch counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Delivery statistics since creation
    pub fn delivery_summary(&self) -> DeliverySummary {
        self.shared
            .deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .summary()
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }
}
