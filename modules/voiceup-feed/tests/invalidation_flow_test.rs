//! Integration tests for change events marking cached queries stale.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use voiceup_common::{
    ContributionMetrics, Correlation, CorrelationFilters, ProblemRow, ProfileRow, ViewerVotes,
    VoiceUpError, VoteTotals,
};
use voiceup_data::{
    ChangeFeed, ChangeMarker, ChangeMarkerSource, ChangeWatcher, Entity, ProblemStore, Session,
    SessionContext,
};
use voiceup_feed::{DashboardFeed, InvalidationCoordinator, QueryCache};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

fn signed_in(viewer: Uuid) -> Arc<SessionContext> {
    let session = SessionContext::new();
    session.establish(Session {
        user_id: viewer,
        email: None,
    });
    Arc::new(session)
}

// ---------------------------------------------------------------------------
// Minimal counting store
// ---------------------------------------------------------------------------

struct CountingStore {
    problems: Vec<ProblemRow>,
    problem_fetches: AtomicUsize,
}

impl CountingStore {
    fn new(problems: Vec<ProblemRow>) -> Self {
        Self {
            problems,
            problem_fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProblemStore for CountingStore {
    async fn fetch_problems(&self) -> Result<Vec<ProblemRow>, VoiceUpError> {
        self.problem_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.problems.clone())
    }

    async fn fetch_nearby(&self, _lat: f64, _lng: f64) -> Result<Vec<ProblemRow>, VoiceUpError> {
        Ok(Vec::new())
    }

    async fn fetch_problem_count(&self) -> Result<u64, VoiceUpError> {
        Ok(self.problems.len() as u64)
    }

    async fn fetch_vote_totals(&self) -> Result<VoteTotals, VoiceUpError> {
        Ok(VoteTotals::new())
    }

    async fn fetch_viewer_votes(&self, _viewer: Uuid) -> Result<ViewerVotes, VoiceUpError> {
        Ok(ViewerVotes::new())
    }

    async fn fetch_contribution_metrics(
        &self,
        _user: Uuid,
    ) -> Result<ContributionMetrics, VoiceUpError> {
        Ok(ContributionMetrics::default())
    }

    async fn fetch_profile(&self, _user: Uuid) -> Result<Option<ProfileRow>, VoiceUpError> {
        Ok(None)
    }

    async fn fetch_correlations(
        &self,
        _filters: &CorrelationFilters,
    ) -> Result<Vec<Correlation>, VoiceUpError> {
        Ok(Vec::new())
    }
}

// =========================================================================
// Coordinator
// =========================================================================

#[tokio::test]
async fn problem_event_marks_the_problem_views() {
    let feed = ChangeFeed::new();
    let cache = Arc::new(QueryCache::new());
    let nearby = cache.nearby(12.9716, 77.5946);
    let _coordinator =
        InvalidationCoordinator::spawn(&feed, cache.clone(), Arc::new(SessionContext::new()));

    feed.publish(Entity::Problems);

    eventually("problem views to go stale", || {
        cache.problems().is_stale() && cache.problem_count().is_stale() && nearby.is_stale()
    })
    .await;
    assert!(!cache.vote_totals().is_stale());
}

#[tokio::test]
async fn vote_event_additionally_marks_vote_totals() {
    let feed = ChangeFeed::new();
    let cache = Arc::new(QueryCache::new());
    let _coordinator =
        InvalidationCoordinator::spawn(&feed, cache.clone(), Arc::new(SessionContext::new()));

    feed.publish(Entity::Votes);

    eventually("vote views to go stale", || {
        cache.problems().is_stale() && cache.vote_totals().is_stale()
    })
    .await;
}

#[tokio::test]
async fn viewer_votes_marked_only_when_signed_in() {
    let viewer = Uuid::new_v4();

    // Signed out: the viewer-votes slot stays untouched.
    let feed = ChangeFeed::new();
    let cache = Arc::new(QueryCache::new());
    let slot = cache.viewer_votes(viewer);
    let _coordinator =
        InvalidationCoordinator::spawn(&feed, cache.clone(), Arc::new(SessionContext::new()));

    feed.publish(Entity::Votes);
    eventually("vote totals to go stale", || cache.vote_totals().is_stale()).await;
    assert!(!slot.is_stale());

    // Signed in: the same event marks the viewer's slot.
    let feed = ChangeFeed::new();
    let cache = Arc::new(QueryCache::new());
    let slot = cache.viewer_votes(viewer);
    let _coordinator = InvalidationCoordinator::spawn(&feed, cache.clone(), signed_in(viewer));

    feed.publish(Entity::Votes);
    eventually("viewer votes to go stale", || slot.is_stale()).await;
}

#[tokio::test]
async fn teardown_stops_marking() {
    let feed = ChangeFeed::new();
    let cache = Arc::new(QueryCache::new());
    let mut coordinator =
        InvalidationCoordinator::spawn(&feed, cache.clone(), Arc::new(SessionContext::new()));

    feed.publish(Entity::Problems);
    eventually("problems to go stale", || cache.problems().is_stale()).await;

    coordinator.shutdown();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Events after teardown change nothing.
    feed.publish(Entity::Votes);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!cache.vote_totals().is_stale());
}

#[tokio::test]
async fn invalidated_reads_refetch() {
    let store = Arc::new(CountingStore::new(vec![ProblemRow {
        id: Some(Uuid::new_v4()),
        ..Default::default()
    }]));
    let cache = Arc::new(QueryCache::new());
    let session = Arc::new(SessionContext::new());
    let change_feed = ChangeFeed::new();
    let _coordinator = InvalidationCoordinator::spawn(&change_feed, cache.clone(), session.clone());

    let feed = DashboardFeed::new(store.clone(), cache.clone(), session);

    feed.problems().await.unwrap();
    feed.problems().await.unwrap();
    assert_eq!(store.problem_fetches.load(Ordering::SeqCst), 1);

    change_feed.publish(Entity::Problems);
    eventually("problems to go stale", || cache.problems().is_stale()).await;

    feed.problems().await.unwrap();
    assert_eq!(store.problem_fetches.load(Ordering::SeqCst), 2);
}

// =========================================================================
// Watcher wiring
// =========================================================================

struct BumpingSource {
    rows: AtomicU64,
}

#[async_trait]
impl ChangeMarkerSource for BumpingSource {
    async fn change_marker(&self, entity: Entity) -> Result<ChangeMarker, VoiceUpError> {
        let row_count = match entity {
            Entity::Problems => self.rows.load(Ordering::SeqCst),
            Entity::Votes => 0,
        };
        Ok(ChangeMarker {
            row_count,
            latest_change_at: None,
        })
    }
}

#[tokio::test]
async fn watcher_drives_invalidation_end_to_end() {
    let source = Arc::new(BumpingSource {
        rows: AtomicU64::new(1),
    });
    let feed = Arc::new(ChangeFeed::new());
    let cache = Arc::new(QueryCache::new());
    let _coordinator =
        InvalidationCoordinator::spawn(&feed, cache.clone(), Arc::new(SessionContext::new()));
    let watcher = ChangeWatcher::spawn(source.clone(), feed.clone(), Duration::from_millis(10));

    // Baseline first, then keep moving the marker until the chain reacts.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let bumper = tokio::spawn(async move {
        loop {
            source.rows.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    eventually("the watcher to mark problems stale", || {
        cache.problems().is_stale()
    })
    .await;

    bumper.abort();
    watcher.abort();
}
