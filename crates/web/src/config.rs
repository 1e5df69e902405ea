//! Filter configuration.
//!
//! Filters never cache settings between requests. Each request takes a fresh snapshot from
//! [`SharedSettings`], so storing a new [`GlobalSettings`] takes effect on the next request.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FilterError;

pub const LOG_REQUESTS_ENABLED: &str = "logRequestsEnabled";
pub const LOG_HEADERS_ENABLED: &str = "logHeadersEnabled";
pub const LOG_BODIES_ENABLED: &str = "logBodiesEnabled";
pub const REQUEST_LOG_BUFFER_SIZE: &str = "requestLogBufferSize";

pub const REQUEST_LOG_BUFFER_SIZE_DEFAULT: u32 = 1024;

/// The mime types compressed by default, as a comma separated list of patterns.
pub const DEFAULT_COMPRESSED_TYPES: &str = "text/.*,.*xml.*,application/json,application/x-javascript";

/// Key/value lookup over the global configuration.
#[cfg_attr(test, mockall::automock)]
pub trait Settings: Send + Sync {
    /// Returns the flag, or `false` when it is not set.
    fn flag(&self, name: &str) -> bool;

    fn int(&self, name: &str) -> Option<i64>;
}

pub type MetadataMap = serde_json::Map<String, Value>;

/// The global configuration document.
///
/// Flags and numbers live in the free-form `metadata` map. The request log buffer size also has a
/// dedicated field, which wins over the metadata entry when both are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    #[serde(default)]
    pub metadata: MetadataMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_post_request_log_buffer_size: Option<u32>,
}

impl GlobalSettings {
    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.metadata.insert(name.to_string(), Value::Bool(value));
        self
    }

    pub fn with_int(mut self, name: &str, value: i64) -> Self {
        self.metadata.insert(name.to_string(), Value::from(value));
        self
    }

    pub fn with_request_log_buffer_size(mut self, size: u32) -> Self {
        self.xml_post_request_log_buffer_size = Some(size);
        self
    }
}

impl Settings for GlobalSettings {
    fn flag(&self, name: &str) -> bool {
        match self.metadata.get(name) {
            Some(Value::Bool(value)) => *value,
            Some(Value::String(value)) => value.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn int(&self, name: &str) -> Option<i64> {
        if name == REQUEST_LOG_BUFFER_SIZE
            && let Some(size) = self.xml_post_request_log_buffer_size
        {
            return Some(i64::from(size));
        }

        match self.metadata.get(name)? {
            Value::Number(value) => value.as_i64(),
            Value::String(value) => value.trim().parse().ok(),
            _ => None,
        }
    }
}

/// The process-wide configuration slot.
///
/// Empty until something stores settings; an empty slot disables every optional filter feature.
#[derive(Debug, Default)]
pub struct SharedSettings {
    current: ArcSwapOption<GlobalSettings>,
}

impl SharedSettings {
    pub fn new(settings: GlobalSettings) -> Self {
        Self { current: ArcSwapOption::new(Some(Arc::new(settings))) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn store(&self, settings: GlobalSettings) {
        self.current.store(Some(Arc::new(settings)));
    }

    pub fn clear(&self) {
        self.current.store(None);
    }

    pub fn load(&self) -> Option<Arc<GlobalSettings>> {
        self.current.load_full()
    }
}

/// What the access log should record for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingConfig {
    pub requests_enabled: bool,
    pub headers_enabled: bool,
    pub bodies_enabled: bool,
    pub body_buffer_size: u32,
}

impl LoggingConfig {
    pub fn disabled() -> Self {
        Self {
            requests_enabled: false,
            headers_enabled: false,
            bodies_enabled: false,
            body_buffer_size: REQUEST_LOG_BUFFER_SIZE_DEFAULT,
        }
    }

    /// Takes a snapshot of the logging settings; no settings at all means logging is off.
    pub fn resolve<S: Settings + ?Sized>(settings: Option<&S>) -> Self {
        let Some(settings) = settings else {
            return Self::disabled();
        };

        let body_buffer_size = settings
            .int(REQUEST_LOG_BUFFER_SIZE)
            .map_or(REQUEST_LOG_BUFFER_SIZE_DEFAULT, |size| u32::try_from(size.max(0)).unwrap_or(u32::MAX));

        Self {
            requests_enabled: settings.flag(LOG_REQUESTS_ENABLED),
            headers_enabled: settings.flag(LOG_HEADERS_ENABLED),
            bodies_enabled: settings.flag(LOG_BODIES_ENABLED),
            body_buffer_size,
        }
    }

    /// Bodies are only logged when enabled and the buffer size leaves room for them.
    pub fn logs_bodies(&self) -> bool {
        self.bodies_enabled && self.body_buffer_size > 0
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Settings of the gzip filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompressionConfig {
    /// Comma separated patterns, each matched against the whole mime type without parameters.
    #[serde(default = "default_compressed_types")]
    pub compressed_types: String,
}

fn default_compressed_types() -> String {
    DEFAULT_COMPRESSED_TYPES.to_string()
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { compressed_types: default_compressed_types() }
    }
}
