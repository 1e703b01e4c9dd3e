use crate::models::holding::Holding;
use crate::models::quote::LiveCache;
use crate::models::view::{Derivation, DerivedRow};
use crate::services::sector_filter::SectorFilter;

/// Combines static holdings with the live cache into per-holding metrics.
///
/// Pure computation: no I/O, no shared state. Totals and portfolio shares
/// cover only the holdings admitted by the active filter, so the shares of
/// a filtered view sum to 100.
pub struct DerivationService;

impl DerivationService {
    pub fn new() -> Self {
        Self
    }

    /// Derive rows and totals for the holdings `filter` admits.
    ///
    /// - Row order follows the input order.
    /// - An empty filtered set yields zero totals and no rows.
    /// - A symbol missing from the cache gets cmp = 0 (so gain/loss equals
    ///   −investment) and no P/E or earnings label.
    /// - When total investment is 0, every portfolio share is 0%.
    pub fn derive(
        &self,
        holdings: &[Holding],
        cache: &LiveCache,
        filter: &SectorFilter,
    ) -> Derivation {
        let filtered = filter.apply(holdings);

        let total_investment: f64 = filtered.iter().map(|h| h.investment()).sum();

        let rows: Vec<DerivedRow> = filtered
            .into_iter()
            .map(|holding| Self::derive_row(holding, cache, total_investment))
            .collect();

        let total_present_value = rows.iter().map(|r| r.present_value).sum();
        let total_gain_loss = rows.iter().map(|r| r.gain_loss).sum();

        Derivation {
            total_investment,
            total_present_value,
            total_gain_loss,
            rows,
        }
    }

    fn derive_row(holding: &Holding, cache: &LiveCache, total_investment: f64) -> DerivedRow {
        let investment = holding.investment();
        let portfolio_percent = if total_investment > 0.0 {
            investment / total_investment * 100.0
        } else {
            0.0
        };

        let live = cache.get(&holding.symbol);
        let cmp = live.map_or(0.0, |q| q.cmp);
        let present_value = cmp * holding.quantity as f64;

        DerivedRow {
            holding: holding.clone(),
            investment,
            portfolio_percent,
            cmp,
            pe_ratio: live.and_then(|q| q.pe_ratio),
            latest_earnings_label: live.and_then(|q| q.latest_earnings_label.clone()),
            present_value,
            gain_loss: present_value - investment,
            has_live_data: live.is_some(),
        }
    }
}

impl Default for DerivationService {
    fn default() -> Self {
        Self::new()
    }
}
