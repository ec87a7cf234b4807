//! Change notifications: a per-entity broadcast hub plus the polling
//! watcher that feeds it.
//!
//! Events are opaque nudges. They say "something in this table changed"
//! and nothing else, so consumers mark their cached queries stale and
//! refetch lazily. Dropping a subscription unsubscribes it.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use voiceup_common::VoiceUpError;

const CHANNEL_CAPACITY: usize = 64;

/// The entity tables change notifications are scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Problems,
    Votes,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::Problems => write!(f, "problems"),
            Entity::Votes => write!(f, "votes"),
        }
    }
}

/// An opaque change nudge. Carries no row detail; any event forces full
/// invalidation of the affected queries.
#[derive(Debug, Clone, Copy)]
pub struct ChangeEvent {
    pub entity: Entity,
    pub observed_at: DateTime<Utc>,
}

/// In-process hub fanning change nudges out to per-entity subscribers.
pub struct ChangeFeed {
    problems: broadcast::Sender<ChangeEvent>,
    votes: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (problems, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (votes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { problems, votes }
    }

    fn sender(&self, entity: Entity) -> &broadcast::Sender<ChangeEvent> {
        match entity {
            Entity::Problems => &self.problems,
            Entity::Votes => &self.votes,
        }
    }

    /// Publish a change nudge. Best-effort: with no live subscribers the
    /// event is dropped.
    pub fn publish(&self, entity: Entity) {
        let event = ChangeEvent {
            entity,
            observed_at: Utc::now(),
        };
        let _ = self.sender(entity).send(event);
    }

    /// Subscribe to one entity's change stream.
    pub fn subscribe(&self, entity: Entity) -> ChangeSubscription {
        ChangeSubscription {
            entity,
            rx: self.sender(entity).subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of an entity's change stream. Dropping it tears
/// the subscription down.
pub struct ChangeSubscription {
    entity: Entity,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// The next change event, or `None` once the feed is gone. A lagged
    /// receiver skips ahead; missed nudges collapse into the next one.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(entity = %self.entity, skipped, "change subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt the subscription to a `Stream` for combinator-style use.
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = ChangeEvent> + Send>> {
        Box::pin(futures::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|event| (event, sub))
        }))
    }
}

/// A cheap per-table snapshot used to detect that something changed: the
/// row count plus the newest `updated_at`. Inserts and in-place edits
/// move the timestamp; deletes move the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMarker {
    pub row_count: u64,
    pub latest_change_at: Option<DateTime<Utc>>,
}

/// Where the watcher reads change markers from.
#[async_trait]
pub trait ChangeMarkerSource: Send + Sync {
    async fn change_marker(&self, entity: Entity) -> Result<ChangeMarker, VoiceUpError>;
}

/// Polls per-table change markers and publishes a nudge whenever one
/// moves. Stands in for the backend's push channel, which is not exposed
/// to this layer.
pub struct ChangeWatcher;

impl ChangeWatcher {
    /// Spawn the polling loop. The first observation of each table only
    /// records a baseline. A failed poll keeps the previous marker and
    /// retries on the next tick.
    pub fn spawn<M>(source: Arc<M>, feed: Arc<ChangeFeed>, interval: Duration) -> JoinHandle<()>
    where
        M: ChangeMarkerSource + 'static,
    {
        info!(interval_secs = interval.as_secs(), "change watcher started");
        tokio::spawn(async move {
            let mut markers: HashMap<Entity, ChangeMarker> = HashMap::new();
            loop {
                tokio::time::sleep(interval).await;
                for entity in [Entity::Problems, Entity::Votes] {
                    match source.change_marker(entity).await {
                        Ok(marker) => {
                            let moved = markers
                                .get(&entity)
                                .map(|previous| *previous != marker)
                                .unwrap_or(false);
                            if moved {
                                feed.publish(entity);
                            }
                            markers.insert(entity, marker);
                        }
                        Err(e) => {
                            warn!(entity = %entity, error = %e, "change marker poll failed");
                        }
                    }
                }
            }
        })
    }
}
