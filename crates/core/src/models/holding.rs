use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A single portfolio line item, supplied by the holdings source.
///
/// `symbol` is the unique key. `purchase_price` and `quantity` are expected
/// to be non-negative; callers guarantee this, the core does not re-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Ticker symbol used for quote lookups (e.g., "AAPL", "RELIANCE.NS")
    pub symbol: String,

    /// Human-readable company name
    pub stock_name: String,

    /// Average purchase price per share
    pub purchase_price: f64,

    /// Number of shares held
    pub quantity: u64,

    /// Listing exchange (e.g., "NSE", "NASDAQ")
    pub exchange: String,

    /// Sector label used for filtering
    pub sector: String,
}

impl Holding {
    pub fn new(
        symbol: impl Into<String>,
        stock_name: impl Into<String>,
        purchase_price: f64,
        quantity: u64,
        exchange: impl Into<String>,
        sector: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            stock_name: stock_name.into(),
            purchase_price,
            quantity,
            exchange: exchange.into(),
            sector: sector.into(),
        }
    }

    /// Amount paid for the position: purchase price × quantity.
    pub fn investment(&self) -> f64 {
        self.purchase_price * self.quantity as f64
    }

    /// Parse a JSON array of holdings.
    pub fn list_from_json(json: &str) -> Result<Vec<Holding>, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}
