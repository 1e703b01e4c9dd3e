use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeSet, HashMap};

use crate::errors::CoreError;
use crate::models::quote::RawQuote;
use super::traits::QuoteClient;

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Yahoo Finance quote source.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices.
/// - **Data**: latest daily close only. P/E ratio and earnings date are
///   not available through this endpoint and are reported as null.
///
/// Yahoo has no batch endpoint, so symbols are looked up one by one.
/// A symbol whose lookup fails or reports a non-finite or negative close
/// is omitted, so its cached quote survives; the call only fails when no
/// symbol produced a quote.
pub struct YahooFinanceQuoteClient {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceQuoteClient {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| {
            CoreError::fetch_failed(PROVIDER_NAME, format!("Failed to create connector: {e}"))
        })?;
        Ok(Self { connector })
    }

    /// Quote for a reported close, or None when the close is not a usable
    /// price (non-finite or negative).
    pub fn quote_from_close(symbol: &str, close: f64) -> Option<RawQuote> {
        (close.is_finite() && close >= 0.0).then(|| RawQuote::new(symbol).with_cmp(close))
    }

    async fn latest_close(&self, symbol: &str) -> Result<f64, CoreError> {
        let resp = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| {
                CoreError::fetch_failed(
                    PROVIDER_NAME,
                    format!("Failed to fetch latest quote for {symbol}: {e}"),
                )
            })?;

        let quote = resp.last_quote().map_err(|e| {
            CoreError::fetch_failed(PROVIDER_NAME, format!("No quote data for {symbol}: {e}"))
        })?;

        Ok(quote.close)
    }
}

#[async_trait]
impl QuoteClient for YahooFinanceQuoteClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_quotes(
        &self,
        symbols: &BTreeSet<String>,
    ) -> Result<HashMap<String, RawQuote>, CoreError> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        let mut last_error = None;

        for symbol in symbols {
            match self.latest_close(symbol).await {
                Ok(close) => match Self::quote_from_close(symbol, close) {
                    Some(quote) => {
                        quotes.insert(symbol.clone(), quote);
                    }
                    None => {
                        debug!("Omitting {symbol}: invalid close {close}");
                        last_error = Some(CoreError::fetch_failed(
                            PROVIDER_NAME,
                            format!("Invalid close for {symbol}: {close}"),
                        ));
                    }
                },
                Err(e) => {
                    debug!("Omitting {symbol}: {e}");
                    last_error = Some(e);
                }
            }
        }

        if quotes.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Ok(quotes)
    }
}
