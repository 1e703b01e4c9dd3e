use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

use crate::errors::CoreError;
use crate::models::quote::RawQuote;

/// Trait abstraction for live quote sources.
///
/// One call fetches the latest quote for a whole batch of symbols. Symbols
/// the source does not recognize are simply absent from the result; only a
/// failure of the call as a whole is an error (`CoreError::FetchFailed`).
/// Implementations must not retry internally.
#[async_trait]
pub trait QuoteClient: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the latest quote for each symbol, keyed by symbol.
    async fn fetch_quotes(
        &self,
        symbols: &BTreeSet<String>,
    ) -> Result<HashMap<String, RawQuote>, CoreError>;
}
