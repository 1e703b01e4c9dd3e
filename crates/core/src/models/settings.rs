use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;

/// Default poll cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 6000;

/// Default upstream request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// How overlapping poll results are applied to the live cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Apply results in the order they resolve. A slow earlier tick may
    /// overwrite a faster later one.
    #[default]
    LastResolved,
    /// Reject results whose tick is older than the newest applied tick.
    StrictRecency,
}

/// Runtime configuration for the live portfolio view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    /// Delay between poll ticks, in milliseconds.
    pub poll_interval_ms: u64,

    /// Batch quote endpoint used by `HttpQuoteClient`.
    pub quote_endpoint: String,

    /// Per-request timeout for upstream calls, in seconds.
    pub request_timeout_secs: u64,

    pub merge_policy: MergePolicy,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            quote_endpoint: "http://localhost:3000/api/quotes".to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            merge_policy: MergePolicy::default(),
        }
    }
}

impl LiveSettings {
    /// Parse settings from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: LiveSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::InvalidSettings(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::InvalidSettings(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.quote_endpoint.trim().is_empty() {
            return Err(CoreError::InvalidSettings(
                "quote_endpoint must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
