//! Best-effort impact stats with graceful degradation.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::error;
use uuid::Uuid;

use voiceup_common::{compute_impact, ImpactStats, Profile};
use voiceup_data::ProblemStore;

/// Computes and remembers a viewer's impact stats. A failed refresh
/// degrades to the last stats computed for the same viewer, then to a
/// zero-count fallback floored at the persisted profile. It never returns
/// an error: a viewer's badges and points only ever appear to grow.
///
/// The remembered stats are keyed by viewer, so a session handed from one
/// user to another never seeds the new viewer from the old one's stats.
pub struct ImpactTracker<S> {
    store: Arc<S>,
    last: ArcSwapOption<ViewerStats>,
}

struct ViewerStats {
    viewer: Uuid,
    stats: Arc<ImpactStats>,
}

impl<S: ProblemStore> ImpactTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            last: ArcSwapOption::from(None),
        }
    }

    /// The most recently computed stats for this viewer, without
    /// refetching. `None` when the last computation was for someone else.
    pub fn last_known(&self, viewer: Uuid) -> Option<Arc<ImpactStats>> {
        self.last
            .load_full()
            .filter(|last| last.viewer == viewer)
            .map(|last| last.stats.clone())
    }

    /// Recompute stats for the viewer. `profile` supplies the persisted
    /// floor: badges already awarded and the stored point total.
    pub async fn refresh(&self, viewer: Uuid, profile: Option<&Profile>) -> Arc<ImpactStats> {
        let previous_badges = self.previous_badges(viewer, profile);
        match self.store.fetch_contribution_metrics(viewer).await {
            Ok(metrics) => {
                let stats = Arc::new(compute_impact(&metrics, &previous_badges));
                self.remember(viewer, stats.clone());
                stats
            }
            Err(e) => {
                error!(error = %e, viewer = %viewer, "impact refresh failed, keeping last known stats");
                if let Some(last) = self.last_known(viewer) {
                    return last;
                }
                let fallback = Arc::new(ImpactStats {
                    reports_count: 0,
                    comments_count: 0,
                    votes_count: 0,
                    points: profile.map(|p| p.points).unwrap_or(0),
                    badges: previous_badges,
                });
                self.remember(viewer, fallback.clone());
                fallback
            }
        }
    }

    fn remember(&self, viewer: Uuid, stats: Arc<ImpactStats>) {
        self.last.store(Some(Arc::new(ViewerStats { viewer, stats })));
    }

    /// In-session badges when this viewer already computed once, else the
    /// persisted profile set.
    fn previous_badges(&self, viewer: Uuid, profile: Option<&Profile>) -> Vec<String> {
        if let Some(last) = self.last_known(viewer) {
            return last.badges.clone();
        }
        profile.map(|p| p.badges.clone()).unwrap_or_default()
    }
}
