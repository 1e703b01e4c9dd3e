use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::quote::RawQuote;
use crate::models::settings::LiveSettings;
use super::traits::QuoteClient;

const PROVIDER_NAME: &str = "Quote API";

/// Batch quote client for a JSON HTTP endpoint.
///
/// - **Request**: `POST {endpoint}` with body `{"symbols": ["AAA", "BBB"]}`.
/// - **Response**: JSON array of quotes in any order, e.g.
///   `[{"symbol": "AAA", "cmp": 120.5, "peRatio": 15.2, "earningsTimestamp": 1700000000}]`.
///   Any live field may be null or omitted; unknown symbols may be left out.
///
/// Transport errors, non-2xx statuses and malformed bodies all surface as
/// `CoreError::FetchFailed`. Records for symbols that were not requested
/// are dropped.
pub struct HttpQuoteClient {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct QuoteRequest<'a> {
    symbols: Vec<&'a str>,
}

impl HttpQuoteClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_settings(settings: &LiveSettings) -> Self {
        Self::new(settings.quote_endpoint.clone(), settings.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Key a response by symbol, keeping only requested symbols.
    /// A symbol reported twice keeps its last record.
    fn index_response(
        requested: &BTreeSet<String>,
        quotes: Vec<RawQuote>,
    ) -> HashMap<String, RawQuote> {
        let mut by_symbol = HashMap::with_capacity(quotes.len());
        for quote in quotes {
            if requested.contains(&quote.symbol) {
                by_symbol.insert(quote.symbol.clone(), quote);
            } else {
                debug!("Ignoring quote for unrequested symbol {}", quote.symbol);
            }
        }
        by_symbol
    }

    /// Parse a response body. Exposed for callers that fetch out of band.
    pub fn parse_response(
        requested: &BTreeSet<String>,
        body: &str,
    ) -> Result<HashMap<String, RawQuote>, CoreError> {
        let quotes: Vec<RawQuote> = serde_json::from_str(body).map_err(|e| {
            CoreError::fetch_failed(PROVIDER_NAME, format!("Malformed quote payload: {e}"))
        })?;
        Ok(Self::index_response(requested, quotes))
    }
}

#[async_trait]
impl QuoteClient for HttpQuoteClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn fetch_quotes(
        &self,
        symbols: &BTreeSet<String>,
    ) -> Result<HashMap<String, RawQuote>, CoreError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let request = QuoteRequest {
            symbols: symbols.iter().map(String::as_str).collect(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::fetch_failed(
                PROVIDER_NAME,
                format!("Quote endpoint returned HTTP {status}"),
            ));
        }

        let body = resp.text().await?;
        Self::parse_response(symbols, &body)
    }
}
