//! Colour key to tile asset resolution with caching and request coalescing
//!
//! Lookups follow a fixed policy: bypass everything when caching is off,
//! answer from the cache when possible, otherwise join the fetch already in
//! flight for the same key, and only then issue a new fetch. A key therefore
//! never has more than one request outstanding, and every caller receives
//! its own copy of the asset.

use crate::io::configuration::COLOUR_ENDPOINT;
use crate::io::error::FetchError;
use crate::mosaic::asset::Asset;
use crate::network::dispatcher::{Dispatcher, Outcome, Request};
use crate::tiling::colour::ColourKey;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of resolving one key
pub type AssetOutcome = Result<Asset, FetchError>;

type Listener = Box<dyn FnOnce(AssetOutcome) + Send + 'static>;

#[derive(Default)]
struct SlotState {
    outcome: Option<AssetOutcome>,
    listeners: Vec<Listener>,
}

/// Settle-once slot shared by every requester of an in-flight key
#[derive(Default)]
pub struct PendingResolution {
    state: Mutex<SlotState>,
    settled: Condvar,
}

impl PendingResolution {
    /// Whether the fetch behind this slot has finished
    pub fn is_settled(&self) -> bool {
        self.state.lock().outcome.is_some()
    }

    /// Block until settled and return a private copy of the outcome
    ///
    /// # Errors
    ///
    /// Returns the fetch failure shared by every waiter
    pub fn wait(&self) -> AssetOutcome {
        let mut state = self.state.lock();
        loop {
            if let Some(outcome) = &state.outcome {
                return outcome.clone();
            }
            self.settled.wait(&mut state);
        }
    }

    /// Run `listener` with a private copy of the outcome once settled
    ///
    /// Runs immediately on the calling thread if already settled.
    pub fn subscribe(&self, listener: impl FnOnce(AssetOutcome) + Send + 'static) {
        let mut state = self.state.lock();
        if let Some(outcome) = state.outcome.clone() {
            drop(state);
            listener(outcome);
            return;
        }
        state.listeners.push(Box::new(listener));
    }

    fn settle(&self, outcome: AssetOutcome) {
        let listeners = {
            let mut state = self.state.lock();
            state.outcome = Some(outcome.clone());
            std::mem::take(&mut state.listeners)
        };
        self.settled.notify_all();
        for listener in listeners {
            listener(outcome.clone());
        }
    }
}

/// Result of [`TileResolver::resolve`]
pub enum Resolution {
    /// Served from cache without waiting
    Ready(Asset),
    /// Waiting on a fetch, possibly shared with other callers
    Pending(Arc<PendingResolution>),
}

impl Resolution {
    /// Whether the asset is available without waiting
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Block until the asset is available
    ///
    /// # Errors
    ///
    /// Returns the failure of the underlying fetch
    pub fn wait(self) -> AssetOutcome {
        match self {
            Self::Ready(asset) => Ok(asset),
            Self::Pending(slot) => slot.wait(),
        }
    }

    /// Deliver the outcome to `listener`, immediately if already available
    pub fn on_settled(self, listener: impl FnOnce(AssetOutcome) + Send + 'static) {
        match self {
            Self::Ready(asset) => listener(Ok(asset)),
            Self::Pending(slot) => slot.subscribe(listener),
        }
    }
}

/// Counters describing resolver behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Lookups answered from the cache
    pub cache_hits: usize,
    /// Lookups that joined a fetch already in flight
    pub coalesced: usize,
    /// Fetches issued to the dispatcher
    pub fetches: usize,
    /// Fetches that failed
    pub failures: usize,
}

#[derive(Default)]
struct ResolverState {
    cache: HashMap<ColourKey, Asset>,
    pending: HashMap<ColourKey, Arc<PendingResolution>>,
    stats: ResolverStats,
}

/// Resolves colour keys to tile assets through a shared dispatcher
pub struct TileResolver {
    dispatcher: Arc<Dispatcher>,
    caching: bool,
    state: Arc<Mutex<ResolverState>>,
}

impl TileResolver {
    /// Create a resolver; with `caching` off every lookup fetches afresh
    pub fn new(dispatcher: Arc<Dispatcher>, caching: bool) -> Self {
        Self {
            dispatcher,
            caching,
            state: Arc::new(Mutex::new(ResolverState::default())),
        }
    }

    /// Whether results are cached and in-flight fetches shared
    pub const fn is_caching(&self) -> bool {
        self.caching
    }

    /// Dispatcher used for fetches
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Server-relative path of the asset for `key`
    pub fn asset_path(key: &ColourKey) -> String {
        format!("{COLOUR_ENDPOINT}/{key}")
    }

    /// Look up the asset for `key`
    pub fn resolve(&self, key: &ColourKey) -> Resolution {
        if !self.caching {
            let slot = Arc::new(PendingResolution::default());
            self.state.lock().stats.fetches += 1;
            let settle = Arc::clone(&slot);
            let state = Arc::clone(&self.state);
            self.fetch(key, move |outcome| {
                if outcome.is_err() {
                    state.lock().stats.failures += 1;
                }
                settle.settle(outcome);
            });
            return Resolution::Pending(slot);
        }

        let slot = {
            let mut state = self.state.lock();
            if let Some(asset) = state.cache.get(key) {
                let asset = asset.clone();
                state.stats.cache_hits += 1;
                return Resolution::Ready(asset);
            }
            if let Some(slot) = state.pending.get(key) {
                let slot = Arc::clone(slot);
                state.stats.coalesced += 1;
                return Resolution::Pending(slot);
            }

            let slot = Arc::new(PendingResolution::default());
            state.pending.insert(key.clone(), Arc::clone(&slot));
            state.stats.fetches += 1;
            slot
        };

        log::debug!("fetching tile for colour {key}");
        let settle = Arc::clone(&slot);
        let state = Arc::clone(&self.state);
        let cache_key = key.clone();
        self.fetch(key, move |outcome| {
            {
                let mut state = state.lock();
                // A reset may have replaced this key's slot with a newer one
                if state
                    .pending
                    .get(&cache_key)
                    .is_some_and(|pending| Arc::ptr_eq(pending, &settle))
                {
                    state.pending.remove(&cache_key);
                }
                match &outcome {
                    Ok(asset) => {
                        state.cache.insert(cache_key, asset.clone());
                    }
                    Err(e) => {
                        state.stats.failures += 1;
                        log::debug!("tile for colour {cache_key} failed: {e}");
                    }
                }
            }
            settle.settle(outcome);
        });

        Resolution::Pending(slot)
    }

    /// Whether an asset for `key` is cached
    pub fn is_cached(&self, key: &ColourKey) -> bool {
        self.state.lock().cache.contains_key(key)
    }

    /// Whether a fetch for `key` is in flight
    pub fn is_pending(&self, key: &ColourKey) -> bool {
        self.state.lock().pending.contains_key(key)
    }

    /// Number of cached assets
    pub fn cached_count(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Snapshot of activity counters
    pub fn stats(&self) -> ResolverStats {
        self.state.lock().stats
    }

    /// Forget every cached asset and counter
    ///
    /// Fetches already in flight still settle their waiters.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.cache.clear();
        state.pending.clear();
        state.stats = ResolverStats::default();
    }

    fn fetch(&self, key: &ColourKey, done: impl FnOnce(AssetOutcome) + Send + 'static) {
        let path = Self::asset_path(key);
        let source = path.clone();
        self.dispatcher.enqueue_with(
            Request::get(path).raw_text(),
            Box::new(move |outcome: Outcome| {
                done(outcome.and_then(|payload| Asset::parse(&source, &payload.into_text())));
            }),
        );
    }
}
