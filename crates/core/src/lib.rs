pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use log::{debug, info};
use models::{
    holding::Holding,
    quote::{normalize_all, LiveCache, RawQuote},
    settings::{LiveSettings, MergePolicy},
    view::{Derivation, ViewModel},
};
use providers::traits::QuoteClient;
use services::{
    derivation_service::DerivationService,
    poller::{PollOutcome, Poller, PollerHandle},
    sector_filter::{distinct_sectors, SectorFilter},
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

use errors::CoreError;

/// Mutable part of the view: only the live cache and the filter change
/// during a session.
#[derive(Debug, Default)]
struct LiveState {
    cache: LiveCache,
    filter: SectorFilter,
}

/// State shared between the owner and the poller's result sink.
struct Shared {
    holdings: Vec<Holding>,
    sectors: Vec<String>,
    merge_policy: MergePolicy,
    derivation_service: DerivationService,
    state: RwLock<LiveState>,
    updates: watch::Sender<ViewModel>,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, LiveState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LiveState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn derive(&self, state: &LiveState) -> Derivation {
        self.derivation_service
            .derive(&self.holdings, &state.cache, &state.filter)
    }

    fn build_view(&self, state: &LiveState) -> ViewModel {
        let derivation = self.derive(state);
        ViewModel {
            sectors: self.sectors.clone(),
            active_filter: state.filter.label().to_string(),
            total_investment: derivation.total_investment,
            rows: derivation.rows,
        }
    }

    fn publish(&self, state: &LiveState) {
        self.updates.send_replace(self.build_view(state));
    }

    /// Apply one poll result. Failures were already logged by the poller
    /// and leave the cache untouched.
    fn apply_outcome(&self, outcome: PollOutcome) {
        let Ok(raw) = outcome.result else {
            return;
        };
        let update = normalize_all(&raw);
        let mut state = self.write();
        if state
            .cache
            .merge_tagged(outcome.seq, update, self.merge_policy)
        {
            debug!(
                "Merged {} quotes from tick {} ({} cached)",
                raw.len(),
                outcome.seq,
                state.cache.len()
            );
            self.publish(&state);
        } else {
            debug!("Rejected stale result of tick {}", outcome.seq);
        }
    }
}

/// Main entry point: a live, filterable view over a fixed set of holdings.
///
/// Owns the live quote cache, the active sector filter and the poller that
/// keeps the cache fresh. Created with `init`, torn down with `dispose`
/// (or by dropping it). Consumers either pull `view_model()` or
/// `subscribe()` to receive a new view after every change.
#[must_use]
pub struct LivePortfolio {
    shared: Arc<Shared>,
    poller: Option<PollerHandle>,
    settings: LiveSettings,
}

impl std::fmt::Debug for LivePortfolio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.read();
        f.debug_struct("LivePortfolio")
            .field("holdings", &self.shared.holdings.len())
            .field("cached_quotes", &state.cache.len())
            .field("filter", &state.filter)
            .field("poller", &self.poller)
            .finish()
    }
}

impl LivePortfolio {
    /// Build the view and start polling `client` on the current tokio
    /// runtime. Fails with `CoreError::Runtime` outside one.
    pub fn init(
        holdings: Vec<Holding>,
        client: Arc<dyn QuoteClient>,
        settings: LiveSettings,
    ) -> Result<Self, CoreError> {
        let mut portfolio = Self::detached(holdings, settings)?;

        let symbols = portfolio.symbols();
        let get_symbols = Arc::new(move || symbols.clone());

        let sink_shared = Arc::clone(&portfolio.shared);
        let on_result = Arc::new(move |outcome: PollOutcome| sink_shared.apply_outcome(outcome));

        portfolio.poller = Some(Poller::start(
            client,
            get_symbols,
            on_result,
            portfolio.settings.poll_interval(),
        )?);
        Ok(portfolio)
    }

    /// Build the view without a poller. Quotes can be pushed with
    /// `apply_quotes`.
    pub fn detached(holdings: Vec<Holding>, settings: LiveSettings) -> Result<Self, CoreError> {
        settings.validate()?;

        let sectors = distinct_sectors(&holdings);
        let derivation_service = DerivationService::new();
        let state = LiveState::default();

        let derivation = derivation_service.derive(&holdings, &state.cache, &state.filter);
        let initial = ViewModel {
            sectors: sectors.clone(),
            active_filter: state.filter.label().to_string(),
            total_investment: derivation.total_investment,
            rows: derivation.rows,
        };
        let (updates, _) = watch::channel(initial);

        info!(
            "Live portfolio initialised with {} holdings in {} sectors",
            holdings.len(),
            sectors.len()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                holdings,
                sectors,
                merge_policy: settings.merge_policy,
                derivation_service,
                state: RwLock::new(state),
                updates,
            }),
            poller: None,
            settings,
        })
    }

    /// Stop polling. Requests still in flight are aborted, so the shared
    /// state is released and subscribers see the channel close.
    pub fn dispose(mut self) {
        self.stop_polling();
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_cancelled())
    }

    // ── Holdings & Sectors ──────────────────────────────────────────

    #[must_use]
    pub fn holdings(&self) -> &[Holding] {
        &self.shared.holdings
    }

    /// Distinct symbols across all holdings, i.e. what each tick requests.
    #[must_use]
    pub fn symbols(&self) -> BTreeSet<String> {
        self.shared
            .holdings
            .iter()
            .map(|h| h.symbol.clone())
            .collect()
    }

    /// Distinct sectors, sorted ascending.
    #[must_use]
    pub fn sectors(&self) -> &[String] {
        &self.shared.sectors
    }

    // ── Filter ──────────────────────────────────────────────────────

    #[must_use]
    pub fn active_filter(&self) -> SectorFilter {
        self.shared.read().filter.clone()
    }

    /// Change the sector filter and publish the recomputed view.
    pub fn set_filter(&self, filter: SectorFilter) {
        let mut state = self.shared.write();
        if state.filter == filter {
            return;
        }
        info!("Sector filter changed to {filter}");
        state.filter = filter;
        self.shared.publish(&state);
    }

    // ── Live Data ───────────────────────────────────────────────────

    /// Normalize and merge quotes obtained outside the poller.
    pub fn apply_quotes(&self, raw: &HashMap<String, RawQuote>) {
        let mut state = self.shared.write();
        state.cache.ingest(raw);
        self.shared.publish(&state);
    }

    #[must_use]
    pub fn cache_snapshot(&self) -> LiveCache {
        self.shared.read().cache.clone()
    }

    // ── View ────────────────────────────────────────────────────────

    /// Rows and totals for the current cache and filter.
    #[must_use]
    pub fn derivation(&self) -> Derivation {
        self.shared.derive(&self.shared.read())
    }

    #[must_use]
    pub fn view_model(&self) -> ViewModel {
        self.shared.build_view(&self.shared.read())
    }

    /// Receive a fresh view after every cache update or filter change.
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.shared.updates.subscribe()
    }

    #[must_use]
    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }
}

impl Drop for LivePortfolio {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
