use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::settings::MergePolicy;

/// Date format for the earnings label: month abbreviation + 2-digit day ("Jan 05").
const EARNINGS_LABEL_FORMAT: &str = "%b %d";

/// A quote record exactly as the upstream source reports it.
/// Every live field may be null or missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    pub symbol: String,

    /// Current market price
    #[serde(default)]
    pub cmp: Option<f64>,

    #[serde(default)]
    pub pe_ratio: Option<f64>,

    /// Latest earnings date as unix seconds
    #[serde(default)]
    pub earnings_timestamp: Option<i64>,
}

impl RawQuote {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            cmp: None,
            pe_ratio: None,
            earnings_timestamp: None,
        }
    }

    pub fn with_cmp(mut self, cmp: f64) -> Self {
        self.cmp = Some(cmp);
        self
    }

    pub fn with_pe_ratio(mut self, pe_ratio: f64) -> Self {
        self.pe_ratio = Some(pe_ratio);
        self
    }

    pub fn with_earnings_timestamp(mut self, ts: i64) -> Self {
        self.earnings_timestamp = Some(ts);
        self
    }
}

/// A quote after ingestion: nullability is resolved once here so the
/// derivation never branches on raw upstream values again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuote {
    /// Current market price, 0 when the source reported none
    pub cmp: f64,
    pub pe_ratio: Option<f64>,
    /// Formatted earnings date ("Nov 14"), None when no timestamp was reported
    pub latest_earnings_label: Option<String>,
}

impl NormalizedQuote {
    /// Normalize using the local timezone for the earnings label.
    pub fn from_raw(raw: &RawQuote) -> Self {
        Self::from_raw_in(raw, &Local)
    }

    /// Normalize using an explicit timezone for the earnings label.
    pub fn from_raw_in<Tz: TimeZone>(raw: &RawQuote, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            cmp: raw.cmp.unwrap_or(0.0),
            pe_ratio: raw.pe_ratio,
            latest_earnings_label: raw
                .earnings_timestamp
                .and_then(|ts| format_earnings_label_in(ts, tz)),
        }
    }
}

/// Format a unix timestamp (seconds) as "Mon DD" in the given timezone.
/// Returns None for timestamps chrono cannot represent.
pub fn format_earnings_label_in<Tz: TimeZone>(timestamp_secs: i64, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let millis = timestamp_secs.checked_mul(1000)?;
    tz.timestamp_millis_opt(millis)
        .earliest()
        .map(|dt| dt.format(EARNINGS_LABEL_FORMAT).to_string())
}

/// Format a unix timestamp (seconds) as "Mon DD" in the local timezone.
pub fn format_earnings_label(timestamp_secs: i64) -> Option<String> {
    format_earnings_label_in(timestamp_secs, &Local)
}

/// Normalize a batch of raw quotes keyed by symbol (local timezone).
pub fn normalize_all(raw: &HashMap<String, RawQuote>) -> HashMap<String, NormalizedQuote> {
    raw.iter()
        .map(|(symbol, quote)| (symbol.clone(), NormalizedQuote::from_raw(quote)))
        .collect()
}

/// Latest successfully normalized quote per symbol.
///
/// Entries are only ever added or overwritten; a failed or partial poll
/// never clears anything. An absent key means "never fetched".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveCache {
    entries: HashMap<String, NormalizedQuote>,

    /// Newest sequence number applied through `merge_tagged`.
    last_applied_seq: Option<u64>,
}

impl LiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay `update` onto the cache. Keys in the update overwrite,
    /// keys absent from it are left untouched. Idempotent.
    pub fn merge(&mut self, update: HashMap<String, NormalizedQuote>) {
        self.entries.extend(update);
    }

    /// Merge a sequence-tagged poll result.
    ///
    /// Under `MergePolicy::LastResolved` every result is applied in the order
    /// it arrives. Under `MergePolicy::StrictRecency` a result older than the
    /// newest one already applied is rejected. Returns whether it was applied.
    pub fn merge_tagged(
        &mut self,
        seq: u64,
        update: HashMap<String, NormalizedQuote>,
        policy: MergePolicy,
    ) -> bool {
        if policy == MergePolicy::StrictRecency
            && self.last_applied_seq.is_some_and(|last| seq < last)
        {
            return false;
        }
        self.merge(update);
        self.last_applied_seq = Some(self.last_applied_seq.map_or(seq, |last| last.max(seq)));
        true
    }

    /// Normalize raw quotes (local timezone) and merge them.
    pub fn ingest(&mut self, raw: &HashMap<String, RawQuote>) {
        self.merge(normalize_all(raw));
    }

    pub fn get(&self, symbol: &str) -> Option<&NormalizedQuote> {
        self.entries.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbols with a cached quote, sorted.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    pub fn last_applied_seq(&self) -> Option<u64> {
        self.last_applied_seq
    }
}
