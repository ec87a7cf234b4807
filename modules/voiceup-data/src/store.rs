//! Read-side store contract for the dashboard surfaces.
//!
//! `DataClient` is the production implementation; tests substitute
//! in-memory doubles. Every method is one backend round trip (or a small
//! fixed set of them) with no caching of its own. Staleness tracking
//! lives a layer up.

use async_trait::async_trait;
use uuid::Uuid;

use voiceup_common::{
    ContributionMetrics, Correlation, CorrelationFilters, ProblemRow, ProfileRow, ViewerVotes,
    VoiceUpError, VoteTotals,
};

/// Read access to problems, votes, profiles and correlation analytics.
#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// All visible problems, newest first. Flagged rows are filtered out
    /// server-side.
    async fn fetch_problems(&self) -> Result<Vec<ProblemRow>, VoiceUpError>;

    /// Problems near a position, ranked by the backend's proximity query.
    async fn fetch_nearby(&self, lat: f64, lng: f64) -> Result<Vec<ProblemRow>, VoiceUpError>;

    /// Total problem count across the platform.
    async fn fetch_problem_count(&self) -> Result<u64, VoiceUpError>;

    /// Net vote total per problem, from the aggregated view.
    async fn fetch_vote_totals(&self) -> Result<VoteTotals, VoiceUpError>;

    /// The viewer's own problem votes.
    async fn fetch_viewer_votes(&self, viewer: Uuid) -> Result<ViewerVotes, VoiceUpError>;

    /// Exact contribution counts for one user.
    async fn fetch_contribution_metrics(
        &self,
        user: Uuid,
    ) -> Result<ContributionMetrics, VoiceUpError>;

    /// The user's profile row, if one exists.
    async fn fetch_profile(&self, user: Uuid) -> Result<Option<ProfileRow>, VoiceUpError>;

    /// Correlation rows matching the given filters.
    async fn fetch_correlations(
        &self,
        filters: &CorrelationFilters,
    ) -> Result<Vec<Correlation>, VoiceUpError>;
}
