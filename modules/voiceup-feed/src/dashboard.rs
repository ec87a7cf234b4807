//! Read surface composing cached queries into the problem views.

use std::sync::Arc;

use tracing::warn;

use voiceup_common::{Problem, Profile, ViewerVotes, VoiceUpError, VoteTotals};
use voiceup_data::{ProblemStore, SessionContext};

use crate::assembler::{assemble, trending, TRENDING_LIMIT};
use crate::cache::QueryCache;

/// The citizen dashboard's read side. Problem lists are the primary
/// source; vote maps are secondary and degrade to empty on failure so a
/// vote outage never takes the feed down.
pub struct DashboardFeed<S> {
    store: Arc<S>,
    cache: Arc<QueryCache>,
    session: Arc<SessionContext>,
}

impl<S: ProblemStore> DashboardFeed<S> {
    pub fn new(store: Arc<S>, cache: Arc<QueryCache>, session: Arc<SessionContext>) -> Self {
        Self {
            store,
            cache,
            session,
        }
    }

    /// All problems, newest first, with merged vote state.
    pub async fn problems(&self) -> Result<Vec<Problem>, VoiceUpError> {
        let rows = self
            .cache
            .problems()
            .read_through(|| self.store.fetch_problems())
            .await?;
        let (totals, viewer_votes) = self.vote_context().await;
        Ok(assemble(
            rows.as_ref().clone(),
            totals.as_ref(),
            viewer_votes.as_deref(),
        ))
    }

    /// Problems near a position, through the same normalize-and-merge
    /// pipeline as the main list.
    pub async fn nearby(&self, lat: f64, lng: f64) -> Result<Vec<Problem>, VoiceUpError> {
        let slot = self.cache.nearby(lat, lng);
        let rows = slot
            .read_through(|| self.store.fetch_nearby(lat, lng))
            .await?;
        let (totals, viewer_votes) = self.vote_context().await;
        Ok(assemble(
            rows.as_ref().clone(),
            totals.as_ref(),
            viewer_votes.as_deref(),
        ))
    }

    /// The top problems by merged vote count.
    pub async fn trending(&self) -> Result<Vec<Problem>, VoiceUpError> {
        let problems = self.problems().await?;
        Ok(trending(&problems, TRENDING_LIMIT))
    }

    /// Total problem count across the platform.
    pub async fn problem_count(&self) -> Result<u64, VoiceUpError> {
        let count = self
            .cache
            .problem_count()
            .read_through(|| self.store.fetch_problem_count())
            .await?;
        Ok(*count)
    }

    /// The signed-in viewer's normalized profile, or `None` when signed
    /// out. A viewer without a stored row still gets a profile built from
    /// the session defaults.
    pub async fn profile(&self) -> Result<Option<Profile>, VoiceUpError> {
        let Some(viewer) = self.session.viewer() else {
            return Ok(None);
        };
        let row = self.store.fetch_profile(viewer).await?.unwrap_or_default();
        Ok(Some(Profile::from_row(row, viewer)))
    }

    /// Fetch the vote maps through the cache. Failures degrade: totals
    /// fall back to the row-embedded counts, viewer votes to none.
    async fn vote_context(&self) -> (Arc<VoteTotals>, Option<Arc<ViewerVotes>>) {
        let totals = match self
            .cache
            .vote_totals()
            .read_through(|| self.store.fetch_vote_totals())
            .await
        {
            Ok(totals) => totals,
            Err(e) => {
                warn!(error = %e, "vote totals unavailable, using embedded counts");
                Arc::new(VoteTotals::new())
            }
        };

        let viewer_votes = match self.session.viewer() {
            Some(viewer) => {
                let slot = self.cache.viewer_votes(viewer);
                match slot
                    .read_through(|| self.store.fetch_viewer_votes(viewer))
                    .await
                {
                    Ok(votes) => Some(votes),
                    Err(e) => {
                        warn!(error = %e, viewer = %viewer, "viewer votes unavailable");
                        None
                    }
                }
            }
            None => None,
        };

        (totals, viewer_votes)
    }
}
