//! Staleness-aware query cache.
//!
//! Each cached query lives in a [`Slot`]: the last fetched value behind an
//! `ArcSwap` plus staleness bookkeeping. Invalidation only marks slots
//! stale; nothing refetches until a consumer reads. A slot serving a stale
//! value is normal operation, not a fault.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwapOption;
use tracing::warn;
use uuid::Uuid;

use voiceup_common::{ProblemRow, ViewerVotes, VoiceUpError, VoteTotals};

use crate::invalidation::CacheKey;

/// Geohash precision for nearby scope keys. Precision 7 cells are roughly
/// 150m across, so reads from the same neighborhood share a slot.
const NEARBY_SCOPE_PRECISION: usize = 7;

/// One cached query result plus its staleness bookkeeping.
pub struct Slot<T> {
    value: ArcSwapOption<T>,
    stale: AtomicBool,
    epoch: AtomicU64,
    refreshing: AtomicBool,
}

/// Resets the refreshing flag when a refresh finishes or its future is
/// dropped mid-flight.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            value: ArcSwapOption::from(None),
            stale: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Current value, fresh or stale, without triggering a fetch.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.value.load_full()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    /// Flag the slot for refresh on next read. Bumping the epoch keeps a
    /// fetch that started before this call from clearing the flag.
    pub fn mark_stale(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Read the slot, fetching if it is empty or stale.
    ///
    /// A refresh already in flight plus a present value serves the stale
    /// value instead of waiting. A failed refresh with a present value
    /// logs and serves the previous value; with nothing cached the error
    /// propagates.
    pub async fn read_through<F, Fut>(&self, fetch: F) -> Result<Arc<T>, VoiceUpError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, VoiceUpError>>,
    {
        let cached = self.value.load_full();
        if let Some(value) = &cached {
            if !self.stale.load(Ordering::SeqCst) {
                return Ok(value.clone());
            }
            if self
                .refreshing
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                // Another reader is already refreshing. Stale beats waiting.
                return Ok(value.clone());
            }
        } else if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Cold slot with a fetch already in flight: fetch independently
            // rather than block. Last completed write wins.
            let epoch = self.epoch.load(Ordering::SeqCst);
            let value = Arc::new(fetch().await?);
            self.store_fetched(value.clone(), epoch);
            return Ok(value);
        }

        let _guard = RefreshGuard(&self.refreshing);
        let epoch = self.epoch.load(Ordering::SeqCst);
        match fetch().await {
            Ok(value) => {
                let value = Arc::new(value);
                self.store_fetched(value.clone(), epoch);
                Ok(value)
            }
            Err(e) => match self.value.load_full() {
                Some(previous) => {
                    warn!(error = %e, "query refresh failed, serving last known value");
                    Ok(previous)
                }
                None => Err(e),
            },
        }
    }

    /// Install a fetched value. The stale flag clears only if no
    /// invalidation arrived while the fetch was in flight.
    fn store_fetched(&self, value: Arc<T>, epoch_at_fetch: u64) {
        self.value.store(Some(value));
        if self.epoch.load(Ordering::SeqCst) == epoch_at_fetch {
            self.stale.store(false, Ordering::SeqCst);
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// All cached dashboard queries. Scoped queries (nearby by position,
/// votes by viewer) hold one slot per scope; slots for scopes nothing
/// reads anymore just sit stale.
pub struct QueryCache {
    problems: Slot<Vec<ProblemRow>>,
    problem_count: Slot<u64>,
    vote_totals: Slot<VoteTotals>,
    nearby: RwLock<HashMap<String, Arc<Slot<Vec<ProblemRow>>>>>,
    viewer_votes: RwLock<HashMap<Uuid, Arc<Slot<ViewerVotes>>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            problems: Slot::new(),
            problem_count: Slot::new(),
            vote_totals: Slot::new(),
            nearby: RwLock::new(HashMap::new()),
            viewer_votes: RwLock::new(HashMap::new()),
        }
    }

    pub fn problems(&self) -> &Slot<Vec<ProblemRow>> {
        &self.problems
    }

    pub fn problem_count(&self) -> &Slot<u64> {
        &self.problem_count
    }

    pub fn vote_totals(&self) -> &Slot<VoteTotals> {
        &self.vote_totals
    }

    /// The nearby slot for a position, keyed by geohash cell.
    pub fn nearby(&self, lat: f64, lng: f64) -> Arc<Slot<Vec<ProblemRow>>> {
        let key = nearby_scope_key(lat, lng);
        {
            let map = self.nearby.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = map.get(&key) {
                return slot.clone();
            }
        }
        let mut map = self.nearby.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(key).or_insert_with(|| Arc::new(Slot::new())).clone()
    }

    /// The viewer-votes slot for one signed-in viewer.
    pub fn viewer_votes(&self, viewer: Uuid) -> Arc<Slot<ViewerVotes>> {
        {
            let map = self
                .viewer_votes
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = map.get(&viewer) {
                return slot.clone();
            }
        }
        let mut map = self
            .viewer_votes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(viewer)
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone()
    }

    /// Mark the slots behind one cache key stale. Marking is idempotent.
    /// Viewer votes are scoped to the signed-in viewer; with no viewer the
    /// key is a no-op.
    pub fn invalidate(&self, key: CacheKey, viewer: Option<Uuid>) {
        match key {
            CacheKey::AllProblems => self.problems.mark_stale(),
            CacheKey::ProblemCount => self.problem_count.mark_stale(),
            CacheKey::VoteTotals => self.vote_totals.mark_stale(),
            CacheKey::NearbyProblems => {
                let map = self.nearby.read().unwrap_or_else(PoisonError::into_inner);
                for slot in map.values() {
                    slot.mark_stale();
                }
            }
            CacheKey::ViewerVotes => {
                if let Some(viewer) = viewer {
                    let map = self
                        .viewer_votes
                        .read()
                        .unwrap_or_else(PoisonError::into_inner);
                    if let Some(slot) = map.get(&viewer) {
                        slot.mark_stale();
                    }
                }
            }
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn nearby_scope_key(lat: f64, lng: f64) -> String {
    geohash::encode(geohash::Coord { x: lng, y: lat }, NEARBY_SCOPE_PRECISION)
        .unwrap_or_else(|_| format!("{lat:.5},{lng:.5}"))
}
