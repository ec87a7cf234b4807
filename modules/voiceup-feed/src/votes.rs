//! Vote fact reconciliation.

use voiceup_common::{Problem, ViewerVotes, VoteTotals};

/// Merge the vote sources into one problem's view: an aggregated net
/// total supersedes the row-embedded count whenever present, and the
/// viewer map fills `user_vote`. Absent sources leave the problem's own
/// fields standing. The maps are never mutated.
pub fn merge_votes(
    mut problem: Problem,
    totals: &VoteTotals,
    viewer_votes: Option<&ViewerVotes>,
) -> Problem {
    problem.votes_count = totals
        .get(&problem.id)
        .copied()
        .unwrap_or(problem.votes_count);
    problem.user_vote = viewer_votes.and_then(|votes| votes.get(&problem.id).copied());
    problem
}
