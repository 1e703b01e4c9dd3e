use thiserror::Error;

/// Unified error type for the portfolio-live-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// A filtered view with no holdings and a holding with no live quote are
/// not errors; the derivation turns both into defined zero/default values.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Quote fetching ──────────────────────────────────────────────
    /// Transport failure, non-success response or malformed payload from a
    /// quote source. The poll loop recovers from it locally.
    #[error("Quote fetch failed ({provider}): {message}")]
    FetchFailed {
        provider: String,
        message: String,
    },

    // ── Configuration / input ───────────────────────────────────────
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Runtime ─────────────────────────────────────────────────────
    /// Polling was requested outside a tokio runtime.
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
}

impl CoreError {
    /// Shorthand for building a `FetchFailed` from a provider name and message.
    pub fn fetch_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::FetchFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// True for errors the poll loop treats as transient.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, CoreError::FetchFailed { .. })
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters: endpoint URLs may carry tokens.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::FetchFailed {
            provider: "HTTP".into(),
            message: sanitized,
        }
    }
}
