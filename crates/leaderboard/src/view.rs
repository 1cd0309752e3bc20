//! Leaderboard View - what to show and when to refresh it
//!
//! State machine:
//! - `Idle` until mounted; a cache entry (fresh or not) is shown at once as
//!   `ShowingCached`
//! - A missing or stale entry starts a refresh (`Refreshing`), which ends in
//!   `ShowingFresh` on success
//! - A failed refresh keeps whatever was shown; with nothing shown it falls
//!   back to the placeholder list (`Failed`)
//!
//! At most one refresh runs at a time; a request arriving while one is in
//! flight is coalesced into it. A started refresh runs to completion on its
//! own task even if the caller goes away. Results landing after `unmount`
//! are dropped.

use chain_reader::{Address, TxHash};
use chrono::{DateTime, Utc};
use factions::{placeholder_factions, Faction};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::cache::{CacheEntry, CacheStore, StalenessPolicy};
use crate::clock::Clock;
use crate::source::FactionSource;
use crate::LOCAL_CHAIN_ID;

/// Delay between a reported transaction and the forced refresh
pub const DEFAULT_CONFIRMATION_DELAY: Duration = Duration::from_secs(3);

const CREATED: u8 = 0;
const MOUNTED: u8 = 1;
const UNMOUNTED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewState {
    Idle,
    ShowingCached,
    Refreshing,
    ShowingFresh,
    Failed,
}

/// Everything a consumer needs to render the leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    pub state: ViewState,
    pub factions: Vec<Faction>,
    /// Known after the first successful refresh
    pub chancellor: Option<Address>,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_refreshing: bool,
}

impl DisplaySnapshot {
    fn idle() -> Self {
        Self {
            state: ViewState::Idle,
            factions: Vec::new(),
            chancellor: None,
            last_updated: None,
            is_refreshing: false,
        }
    }

    /// Whether a faction is led by the current chancellor
    pub fn is_chancellor(&self, faction: &Faction) -> bool {
        self.chancellor == Some(faction.leader)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Only when the cache is missing or past its TTL
    IfStale,
    /// Regardless of cache age
    Force,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshOutcome {
    /// New data fetched, cached and shown
    Refreshed,
    /// Cache still within its TTL; nothing fetched
    CacheFresh,
    /// Another refresh was already running
    Coalesced,
    /// Fetch failed; fallback shown
    Failed,
    /// View not mounted (or unmounted mid-flight); result dropped
    Discarded,
    /// Trigger did not call for a refresh
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Network identity used for TTL selection
    pub chain_id: u64,
    pub staleness: StalenessPolicy,
    /// Wait after a reported transaction before refreshing
    pub confirmation_delay: Duration,
    /// Refresh automatically after reported transactions
    pub on_demand_update: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            chain_id: LOCAL_CHAIN_ID,
            staleness: StalenessPolicy::default(),
            confirmation_delay: DEFAULT_CONFIRMATION_DELAY,
            on_demand_update: true,
        }
    }
}

/// A post-transaction timer that has not fired yet
struct PendingRefresh {
    hash: TxHash,
    abort: AbortHandle,
}

#[derive(Default)]
struct TxTimer {
    /// Most recently reported hash
    last: Option<TxHash>,
    pending: Option<PendingRefresh>,
}

struct ViewInner {
    source: FactionSource,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    config: ViewConfig,
    display: watch::Sender<DisplaySnapshot>,
    lifecycle: AtomicU8,
    in_flight: AtomicBool,
    tx_timer: Mutex<TxTimer>,
}

impl ViewInner {
    fn is_mounted(&self) -> bool {
        self.lifecycle.load(Ordering::SeqCst) == MOUNTED
    }

    fn read_cache(&self) -> Option<CacheEntry> {
        match self.cache.read() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read leaderboard cache");
                None
            }
        }
    }

    fn cache_is_fresh(&self) -> bool {
        let now = self.clock.now_ms();
        match self.read_cache() {
            Some(entry) => {
                let fresh = self
                    .config
                    .staleness
                    .is_fresh(&entry, self.config.chain_id, now);
                tracing::debug!(age_ms = entry.age_ms(now), fresh, "Checked cache age");
                fresh
            }
            None => false,
        }
    }
}

/// Owns the single-flight flag for one refresh.
///
/// Marks the display as refreshing on acquire. A refresh that ends without
/// settling (discarded, panicked, cancelled) puts the previous state back.
struct RefreshGuard {
    inner: Arc<ViewInner>,
    previous: ViewState,
    settled: bool,
}

impl RefreshGuard {
    fn acquire(inner: &Arc<ViewInner>) -> Option<Self> {
        inner
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;

        let mut previous = ViewState::Idle;
        inner.display.send_modify(|s| {
            previous = s.state;
            s.state = ViewState::Refreshing;
            s.is_refreshing = true;
        });

        Some(Self {
            inner: inner.clone(),
            previous,
            settled: false,
        })
    }

    /// Apply the refresh result and clear the refreshing marker
    fn settle(mut self, apply: impl FnOnce(&mut DisplaySnapshot, ViewState)) {
        let previous = self.previous;
        self.inner.display.send_modify(|s| {
            apply(s, previous);
            s.is_refreshing = false;
        });
        self.settled = true;
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        if !self.settled {
            let previous = self.previous;
            self.inner.display.send_modify(|s| {
                if s.state == ViewState::Refreshing {
                    s.state = previous;
                }
                s.is_refreshing = false;
            });
        }
        self.inner.in_flight.store(false, Ordering::SeqCst);
    }
}

fn timestamp(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Handle to one leaderboard view; clones share state
#[derive(Clone)]
pub struct LeaderboardView {
    inner: Arc<ViewInner>,
}

impl LeaderboardView {
    pub fn new(
        source: FactionSource,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        config: ViewConfig,
    ) -> Self {
        let (display, _) = watch::channel(DisplaySnapshot::idle());
        Self {
            inner: Arc::new(ViewInner {
                source,
                cache,
                clock,
                config,
                display,
                lifecycle: AtomicU8::new(CREATED),
                in_flight: AtomicBool::new(false),
                tx_timer: Mutex::new(TxTimer::default()),
            }),
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.inner.config
    }

    /// Current display state
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.inner.display.borrow().clone()
    }

    /// Receive every display change
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.inner.display.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Show the cached entry immediately, then refresh if it is missing or stale
    pub async fn mount(&self) -> RefreshOutcome {
        let inner = &self.inner;
        if inner
            .lifecycle
            .compare_exchange(CREATED, MOUNTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
            && !inner.is_mounted()
        {
            return RefreshOutcome::Discarded;
        }

        if let Some(entry) = inner.read_cache() {
            inner.display.send_modify(|s| {
                if s.state == ViewState::Idle {
                    s.state = ViewState::ShowingCached;
                    s.factions = entry.factions;
                    s.last_updated = timestamp(entry.fetched_at_ms);
                }
            });
            tracing::debug!("Showing cached leaderboard");
        }

        self.refresh(RefreshMode::IfStale).await
    }

    /// Stop applying results and cancel any scheduled refresh. Terminal.
    pub fn unmount(&self) {
        self.inner.lifecycle.store(UNMOUNTED, Ordering::SeqCst);
        if let Some(pending) = self.inner.tx_timer.lock().pending.take() {
            pending.abort.abort();
        }
        tracing::debug!("Leaderboard view unmounted");
    }

    /// Run one refresh cycle
    pub async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome {
        let inner = &self.inner;
        if !inner.is_mounted() {
            return RefreshOutcome::Discarded;
        }
        if mode == RefreshMode::IfStale && inner.cache_is_fresh() {
            return RefreshOutcome::CacheFresh;
        }

        let Some(guard) = RefreshGuard::acquire(inner) else {
            tracing::debug!("Refresh already in flight, coalescing");
            return RefreshOutcome::Coalesced;
        };

        // Dropping the caller must not cut the refresh short
        match tokio::spawn(run_refresh(guard)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Refresh task did not complete");
                RefreshOutcome::Failed
            }
        }
    }

    /// User-requested refresh; ignores the TTL
    pub async fn manual_refresh(&self) -> RefreshOutcome {
        self.refresh(RefreshMode::Force).await
    }

    /// The view became visible or hidden
    pub async fn on_visibility(&self, visible: bool) -> RefreshOutcome {
        if !self.is_mounted() {
            return RefreshOutcome::Discarded;
        }
        if !visible {
            return RefreshOutcome::Ignored;
        }
        self.refresh(RefreshMode::IfStale).await
    }

    /// Re-check staleness every `period` until the view is unmounted.
    ///
    /// The server-side stand-in for the page regaining visibility.
    pub async fn watch_staleness(&self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            if !self.is_mounted() {
                break;
            }
            let outcome = self.refresh(RefreshMode::IfStale).await;
            tracing::debug!(?outcome, "Periodic staleness check");
        }
    }

    /// Schedule a forced refresh once a just-submitted transaction has had
    /// time to confirm.
    ///
    /// Returns `None` when nothing new was scheduled: updates are disabled,
    /// the view is not mounted, or `hash` is the one already reported. A new
    /// hash cancels the previous timer if it has not fired; a refresh that
    /// has started is left to finish. Must be called from within a Tokio
    /// runtime.
    pub fn on_transaction(&self, hash: TxHash) -> Option<JoinHandle<RefreshOutcome>> {
        let inner = &self.inner;
        if !inner.config.on_demand_update || !inner.is_mounted() {
            return None;
        }

        let mut timer = inner.tx_timer.lock();
        if timer.last == Some(hash) {
            return None;
        }
        // Only a timer that has not fired is still in the slot
        if let Some(previous) = timer.pending.take() {
            previous.abort.abort();
        }

        let view = self.clone();
        let delay = inner.config.confirmation_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut timer = view.inner.tx_timer.lock();
                if !timer.pending.as_ref().is_some_and(|p| p.hash == hash) {
                    return RefreshOutcome::Ignored;
                }
                // Fired; a later report must not abort the refresh below
                timer.pending = None;
            }
            let outcome = view.refresh(RefreshMode::Force).await;
            tracing::debug!(%hash, ?outcome, "Post-transaction refresh finished");
            outcome
        });

        tracing::debug!(%hash, delay_ms = delay.as_millis() as u64, "Scheduled post-transaction refresh");
        timer.last = Some(hash);
        timer.pending = Some(PendingRefresh {
            hash,
            abort: handle.abort_handle(),
        });
        Some(handle)
    }
}

/// Fetch, then cache and show the result; runs on its own task
async fn run_refresh(guard: RefreshGuard) -> RefreshOutcome {
    let inner = guard.inner.clone();
    let result = inner.source.fetch().await;

    if !inner.is_mounted() {
        tracing::debug!("View unmounted during refresh, discarding result");
        return RefreshOutcome::Discarded;
    }

    match result {
        Ok(snapshot) => {
            let now = inner.clock.now_ms();
            let ttl_ms = inner.config.staleness.ttl_ms(inner.config.chain_id);
            // Never move the stored time backwards, unless it is implausibly far ahead
            let fetched_at_ms = match inner.read_cache() {
                Some(prev) if prev.fetched_at_ms.saturating_sub(now) < ttl_ms => {
                    now.max(prev.fetched_at_ms)
                }
                _ => now,
            };
            let entry = CacheEntry {
                factions: snapshot.factions,
                fetched_at_ms,
            };
            if let Err(e) = inner.cache.write(&entry) {
                tracing::warn!(error = %e, "Failed to write leaderboard cache");
            }

            tracing::info!(
                factions = entry.factions.len(),
                chancellor = %snapshot.chancellor,
                from = snapshot.range.from,
                to = snapshot.range.to,
                "Leaderboard refreshed"
            );

            guard.settle(|s, _| {
                s.state = ViewState::ShowingFresh;
                s.factions = entry.factions;
                s.chancellor = Some(snapshot.chancellor);
                s.last_updated = timestamp(fetched_at_ms);
            });
            RefreshOutcome::Refreshed
        }
        Err(e) => {
            tracing::warn!(error = %e, "Leaderboard refresh failed");
            guard.settle(|s, previous| {
                if s.factions.is_empty() && s.last_updated.is_none() {
                    s.state = ViewState::Failed;
                    s.factions = placeholder_factions();
                } else {
                    s.state = previous;
                }
            });
            RefreshOutcome::Failed
        }
    }
}
