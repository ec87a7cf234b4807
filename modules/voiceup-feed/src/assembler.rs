//! Normalize-then-merge pipeline behind the problem views.

use voiceup_common::{Problem, ProblemRow, ViewerVotes, VoteTotals};

use crate::votes::merge_votes;

/// How many problems the trending view keeps.
pub const TRENDING_LIMIT: usize = 5;

/// Run raw rows through coordinate normalization and vote merging,
/// preserving input order.
pub fn assemble(
    rows: Vec<ProblemRow>,
    totals: &VoteTotals,
    viewer_votes: Option<&ViewerVotes>,
) -> Vec<Problem> {
    rows.into_iter()
        .map(Problem::from_row)
        .map(|problem| merge_votes(problem, totals, viewer_votes))
        .collect()
}

/// Top problems by merged vote count. The sort is stable, so ties keep
/// their input order.
pub fn trending(problems: &[Problem], limit: usize) -> Vec<Problem> {
    let mut ranked = problems.to_vec();
    ranked.sort_by(|a, b| b.votes_count.cmp(&a.votes_count));
    ranked.truncate(limit);
    ranked
}
