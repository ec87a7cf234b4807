//! Contribution scoring and badge derivation.
//!
//! Badge rules are data: each rule is an independent predicate over one
//! metrics snapshot, so evaluation order never affects the result. Earned
//! badges are never revoked; the previously persisted set is the floor.

use crate::types::{ContributionMetrics, ImpactStats};

/// Points awarded per submitted problem report.
pub const POINTS_PER_REPORT: u64 = 5;
/// Points awarded per comment.
pub const POINTS_PER_COMMENT: u64 = 2;
/// Points awarded per vote cast.
pub const POINTS_PER_VOTE: u64 = 1;

pub struct BadgeRule {
    pub id: &'static str,
    pub label: &'static str,
    pub qualifies: fn(&ContributionMetrics, u64) -> bool,
}

/// The badge table. Predicates see the metrics snapshot and the points
/// already derived from it.
pub const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule {
        id: "first-action",
        label: "First Contribution",
        qualifies: |m, _| m.reports_count > 0 || m.comments_count > 0 || m.votes_count > 0,
    },
    BadgeRule {
        id: "reporter",
        label: "Active Reporter",
        qualifies: |m, _| m.reports_count >= 3,
    },
    BadgeRule {
        id: "voter",
        label: "Community Voter",
        qualifies: |m, _| m.votes_count >= 10,
    },
    BadgeRule {
        id: "conversation",
        label: "Conversation Starter",
        qualifies: |m, _| m.comments_count >= 5,
    },
    BadgeRule {
        id: "change-maker",
        label: "Change Maker",
        qualifies: |_, points| points >= 50,
    },
];

/// Point score for a metrics snapshot; saturates at `u64::MAX`.
pub fn points_for(metrics: &ContributionMetrics) -> u64 {
    metrics
        .reports_count
        .saturating_mul(POINTS_PER_REPORT)
        .saturating_add(metrics.comments_count.saturating_mul(POINTS_PER_COMMENT))
        .saturating_add(metrics.votes_count.saturating_mul(POINTS_PER_VOTE))
}

/// Derive points and the updated badge set from a metrics snapshot.
///
/// The result keeps `previous_badges` in order (deduplicated), then appends
/// newly earned labels in rule-table order. Idempotent: feeding the output
/// back in as `previous_badges` yields the same set.
pub fn compute_impact(metrics: &ContributionMetrics, previous_badges: &[String]) -> ImpactStats {
    let points = points_for(metrics);

    let mut badges: Vec<String> = Vec::with_capacity(previous_badges.len() + BADGE_RULES.len());
    for badge in previous_badges {
        if !badges.contains(badge) {
            badges.push(badge.clone());
        }
    }
    for rule in BADGE_RULES {
        if (rule.qualifies)(metrics, points) && !badges.iter().any(|b| b == rule.label) {
            badges.push(rule.label.to_string());
        }
    }

    ImpactStats {
        reports_count: metrics.reports_count,
        comments_count: metrics.comments_count,
        votes_count: metrics.votes_count,
        points,
        badges,
    }
}
