use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::holding::Holding;

/// Label of the "no filtering" selection.
pub const ALL_SECTORS: &str = "All Sectors";

/// The currently selected sector filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SectorFilter {
    /// No filtering: every holding is shown.
    #[default]
    All,
    /// Only holdings whose sector matches exactly.
    Sector(String),
}

impl SectorFilter {
    /// Build a filter from a display label; `"All Sectors"` maps to `All`.
    pub fn from_label(label: &str) -> Self {
        if label == ALL_SECTORS {
            SectorFilter::All
        } else {
            SectorFilter::Sector(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SectorFilter::All => ALL_SECTORS,
            SectorFilter::Sector(sector) => sector,
        }
    }

    pub fn matches(&self, holding: &Holding) -> bool {
        match self {
            SectorFilter::All => true,
            SectorFilter::Sector(sector) => holding.sector == *sector,
        }
    }

    /// Keep the holdings this filter admits, preserving input order.
    pub fn apply<'a>(&self, holdings: &'a [Holding]) -> Vec<&'a Holding> {
        holdings.iter().filter(|h| self.matches(h)).collect()
    }
}

impl std::fmt::Display for SectorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Distinct sectors of `holdings`, sorted ascending.
pub fn distinct_sectors(holdings: &[Holding]) -> Vec<String> {
    holdings
        .iter()
        .map(|h| h.sector.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
