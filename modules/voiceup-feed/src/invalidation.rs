//! Change events to stale cache entries.
//!
//! The mapping from a change event to the cache keys it dirties is a pure
//! function, testable without a live connection. The coordinator applies
//! it: subscriptions only flag staleness and never refetch, so consumers
//! pull fresh data on their next read.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use voiceup_data::{ChangeFeed, Entity, SessionContext};

use crate::cache::QueryCache;

/// Cached query identities subject to invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    AllProblems,
    NearbyProblems,
    ProblemCount,
    VoteTotals,
    ViewerVotes,
}

/// The cache keys dirtied by one change event.
///
/// Problem events dirty the three problem views, plus the viewer's own
/// votes when a viewer is signed in. Vote events dirty all of those and
/// the vote totals: a vote event always invalidates a strict superset of
/// a problem event.
pub fn invalidation_set(entity: Entity, viewer_known: bool) -> Vec<CacheKey> {
    let mut keys = vec![
        CacheKey::AllProblems,
        CacheKey::NearbyProblems,
        CacheKey::ProblemCount,
    ];
    if viewer_known {
        keys.push(CacheKey::ViewerVotes);
    }
    if entity == Entity::Votes {
        keys.push(CacheKey::VoteTotals);
    }
    keys
}

/// Subscribes to both entity streams and marks affected slots stale as
/// events arrive. Shutting down (or dropping) the coordinator tears the
/// subscriptions down; later events are ignored.
pub struct InvalidationCoordinator {
    tasks: Vec<JoinHandle<()>>,
}

impl InvalidationCoordinator {
    pub fn spawn(feed: &ChangeFeed, cache: Arc<QueryCache>, session: Arc<SessionContext>) -> Self {
        let tasks = [Entity::Problems, Entity::Votes]
            .into_iter()
            .map(|entity| {
                let mut subscription = feed.subscribe(entity);
                let cache = cache.clone();
                let session = session.clone();
                tokio::spawn(async move {
                    while let Some(event) = subscription.next().await {
                        let viewer = session.viewer();
                        let keys = invalidation_set(event.entity, viewer.is_some());
                        for key in &keys {
                            cache.invalidate(*key, viewer);
                        }
                        debug!(entity = %event.entity, keys = keys.len(), "marked cached queries stale");
                    }
                })
            })
            .collect();
        Self { tasks }
    }

    pub fn shutdown(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.tasks.clear();
    }
}

impl Drop for InvalidationCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
