use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::errors::CoreError;
use crate::models::quote::RawQuote;
use crate::providers::traits::QuoteClient;

/// Supplies the symbol set to request on each tick.
pub type SymbolSource = Arc<dyn Fn() -> BTreeSet<String> + Send + Sync>;

/// Receives every poll result that was not discarded by cancellation.
pub type OutcomeSink = Arc<dyn Fn(PollOutcome) + Send + Sync>;

/// Result of one tick, tagged with the tick's sequence number.
/// Sequence numbers start at 1 and increase by one per issued request.
#[derive(Debug)]
pub struct PollOutcome {
    pub seq: u64,
    pub result: Result<HashMap<String, RawQuote>, CoreError>,
}

#[derive(Default)]
struct PollerState {
    cancelled: RwLock<bool>,
    ticks_issued: AtomicU64,
    /// Fetch tasks that may still be running; aborted on cancel.
    in_flight: Mutex<Vec<AbortHandle>>,
}

impl PollerState {
    fn is_cancelled(&self) -> bool {
        *self.cancelled.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, Vec<AbortHandle>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand an outcome to the sink unless the poller was cancelled.
    /// The read guard is held across the sink call, so `cancel` cannot
    /// complete while a delivery is in progress.
    fn deliver(&self, outcome: PollOutcome, sink: &(dyn Fn(PollOutcome) + Send + Sync)) {
        let cancelled = self.cancelled.read().unwrap_or_else(PoisonError::into_inner);
        if *cancelled {
            debug!("Discarding result of tick {} after cancellation", outcome.seq);
            return;
        }
        if let Err(e) = &outcome.result {
            warn!("Quote poll {} failed: {e}", outcome.seq);
        }
        sink(outcome);
    }
}

/// Repeating quote refresh.
///
/// Fires once immediately and then every `interval`. Each tick runs its
/// fetch in its own task: a slow or failing tick never delays the next one,
/// and overlapping requests are allowed. Results reach the sink in the
/// order they resolve.
pub struct Poller;

impl Poller {
    /// Start polling on the current tokio runtime.
    /// Fails with `CoreError::Runtime` when called outside one.
    pub fn start(
        client: Arc<dyn QuoteClient>,
        get_symbols: SymbolSource,
        on_result: OutcomeSink,
        interval: Duration,
    ) -> Result<PollerHandle, CoreError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Runtime(format!("Quote poller needs a tokio runtime: {e}")))?;

        let state = Arc::new(PollerState::default());
        let period = interval.max(Duration::from_millis(1));

        info!(
            "Starting quote poller ({}) every {} ms",
            client.name(),
            period.as_millis()
        );

        let ticker_state = Arc::clone(&state);
        let ticker = runtime.spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                let symbols = get_symbols();
                if symbols.is_empty() {
                    debug!("Skipping poll tick: no symbols to request");
                    continue;
                }

                // Checked under the in-flight lock so `cancel` either sees
                // this task in the list or this tick sees the flag.
                let mut in_flight = ticker_state.in_flight();
                if ticker_state.is_cancelled() {
                    break;
                }
                in_flight.retain(|task| !task.is_finished());

                let seq = ticker_state.ticks_issued.fetch_add(1, Ordering::SeqCst) + 1;
                debug!("Poll tick {seq}: requesting {} symbols", symbols.len());

                let client = Arc::clone(&client);
                let sink = Arc::clone(&on_result);
                let state = Arc::clone(&ticker_state);
                let fetch = tokio::spawn(async move {
                    let result = client.fetch_quotes(&symbols).await;
                    state.deliver(PollOutcome { seq, result }, sink.as_ref());
                });
                in_flight.push(fetch.abort_handle());
            }
        });

        Ok(PollerHandle { state, ticker })
    }
}

/// Owner handle of a running poller. Cancelling (or dropping) it stops
/// the timer and aborts requests still in flight; a result that is already
/// being delivered completes before `cancel` returns.
pub struct PollerHandle {
    state: Arc<PollerState>,
    ticker: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the poller. Once this returns the sink is never invoked again.
    pub fn cancel(&self) {
        {
            let mut cancelled = self
                .state
                .cancelled
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.ticker.abort();
        let aborted = {
            let mut in_flight = self.state.in_flight();
            let running = in_flight.iter().filter(|task| !task.is_finished()).count();
            for task in in_flight.drain(..) {
                task.abort();
            }
            running
        };
        if aborted > 0 {
            debug!("Aborted {aborted} in-flight quote requests");
        }
        info!(
            "Quote poller cancelled after {} ticks",
            self.state.ticks_issued.load(Ordering::SeqCst)
        );
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Number of requests issued so far.
    pub fn ticks_issued(&self) -> u64 {
        self.state.ticks_issued.load(Ordering::SeqCst)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("cancelled", &self.is_cancelled())
            .field("ticks_issued", &self.ticks_issued())
            .finish()
    }
}
