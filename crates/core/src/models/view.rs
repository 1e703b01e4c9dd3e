use serde::{Deserialize, Serialize};

use super::holding::Holding;

/// Shown in place of a live field that has no value yet.
pub const MISSING_VALUE: &str = "-";

/// Per-holding presentation record combining static and live data.
/// Recomputed on every update, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRow {
    pub holding: Holding,

    /// purchase price × quantity
    pub investment: f64,

    /// Share of the filtered set's total investment, in percent
    pub portfolio_percent: f64,

    /// Current market price, 0 until the first successful fetch
    pub cmp: f64,

    pub pe_ratio: Option<f64>,

    pub latest_earnings_label: Option<String>,

    /// cmp × quantity
    pub present_value: f64,

    /// present value − investment
    pub gain_loss: f64,

    /// False when the symbol has never been fetched successfully; the live
    /// fields above are then defaults, not market data.
    pub has_live_data: bool,
}

impl DerivedRow {
    pub fn is_gain(&self) -> bool {
        self.gain_loss >= 0.0
    }

    pub fn investment_display(&self) -> String {
        format_money(self.investment)
    }

    pub fn portfolio_percent_display(&self) -> String {
        format_percent(self.portfolio_percent)
    }

    pub fn cmp_display(&self) -> String {
        if self.has_live_data {
            format_money(self.cmp)
        } else {
            MISSING_VALUE.to_string()
        }
    }

    pub fn present_value_display(&self) -> String {
        format_money(self.present_value)
    }

    pub fn gain_loss_display(&self) -> String {
        format_money(self.gain_loss)
    }

    pub fn pe_ratio_display(&self) -> String {
        self.pe_ratio
            .map(|pe| format!("{pe:.2}"))
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    }

    pub fn latest_earnings_display(&self) -> String {
        self.latest_earnings_label
            .clone()
            .unwrap_or_else(|| MISSING_VALUE.to_string())
    }
}

/// Result of one derivation pass over the filtered holdings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Derivation {
    pub total_investment: f64,
    pub total_present_value: f64,
    pub total_gain_loss: f64,
    /// In input order of the filtered holdings
    pub rows: Vec<DerivedRow>,
}

/// Everything the rendering layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    /// Distinct sectors, sorted ascending
    pub sectors: Vec<String>,
    /// Label of the active filter ("All Sectors" or a sector name)
    pub active_filter: String,
    pub total_investment: f64,
    pub rows: Vec<DerivedRow>,
}

/// Two decimals, no currency symbol.
pub fn format_money(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}
