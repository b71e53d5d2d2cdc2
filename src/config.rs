//! Client configuration and per-call option plumbing
//!
//! Options arrive as a type-erased bag destined for the caching runtime,
//! with one reserved section (`"route"`) that this core consumes itself.
//! Abort-on-unmount resolves with call > config > client precedence and is
//! off unless someone turns it on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved key inside an options bag for settings this core consumes.
pub const BASE_OPTIONS_KEY: &str = "route";

/// Configuration applied to every operation created through one client.
///
/// # Example
/// ```rust,ignore
/// let config = ClientConfig::new().with_abort_on_unmount(true);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Operation-level abort-on-unmount default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_on_unmount: Option<bool>,
    /// Options merged under every query's passthrough options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_query_options: Option<Value>,
}

impl ClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the operation-level abort-on-unmount default.
    pub fn with_abort_on_unmount(mut self, enabled: bool) -> Self {
        self.abort_on_unmount = Some(enabled);
        self
    }

    /// Set options merged under every query's passthrough options.
    pub fn with_default_query_options(mut self, options: Value) -> Self {
        self.default_query_options = Some(options);
        self
    }
}

/// Per-call settings consumed by this core, extracted from the reserved
/// section of an options bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryBaseOptions {
    /// Call-level abort-on-unmount override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_on_unmount: Option<bool>,
}

/// Split an options bag into the reserved base section and the passthrough
/// remainder for the caching runtime.
pub fn split_base_options(options: Option<Value>) -> (QueryBaseOptions, Option<Value>) {
    match options {
        Some(Value::Object(mut map)) => {
            let base = match map.remove(BASE_OPTIONS_KEY) {
                Some(raw) => serde_json::from_value(raw).unwrap_or_default(),
                None => QueryBaseOptions::default(),
            };
            let passthrough = (!map.is_empty()).then_some(Value::Object(map));
            (base, passthrough)
        }
        other => (QueryBaseOptions::default(), other),
    }
}

/// Shallow-merge two option objects; entries in `options` win.
pub fn merge_option_objects(defaults: Option<Value>, options: Option<Value>) -> Option<Value> {
    match (defaults, options) {
        (Some(Value::Object(mut merged)), Some(Value::Object(overrides))) => {
            for (key, value) in overrides {
                merged.insert(key, value);
            }
            Some(Value::Object(merged))
        }
        (defaults, None) => defaults,
        (_, options) => options,
    }
}

/// Resolve abort-on-unmount with call > config > client precedence.
pub fn resolve_abort_on_unmount(
    call: &QueryBaseOptions,
    config: Option<&ClientConfig>,
    client_default: bool,
) -> bool {
    call.abort_on_unmount
        .or_else(|| config.and_then(|c| c.abort_on_unmount))
        .unwrap_or(client_default)
}
