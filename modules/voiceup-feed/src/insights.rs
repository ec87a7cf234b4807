//! Ministry view: correlation rows, summary stats and CSV handoff.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use voiceup_common::{write_csv, Correlation, CorrelationFilters, ProblemCategory, VoiceUpError};
use voiceup_data::ProblemStore;

/// Aggregates for the ministry header cards.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationSummary {
    pub top: Option<Correlation>,
    pub average_score: f64,
    pub total: usize,
}

/// The strongest correlation. Ties keep the earliest row.
pub fn top_correlation(rows: &[Correlation]) -> Option<&Correlation> {
    rows.iter().reduce(|best, row| {
        if row.correlation_score > best.correlation_score {
            row
        } else {
            best
        }
    })
}

pub fn summarize(rows: &[Correlation]) -> CorrelationSummary {
    let average_score = if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(|r| r.correlation_score).sum::<f64>() / rows.len() as f64
    };
    CorrelationSummary {
        top: top_correlation(rows).cloned(),
        average_score,
        total: rows.len(),
    }
}

/// CSV for the export button. No rows exports as an empty string, not an
/// error.
pub fn export_csv(rows: &[Correlation]) -> String {
    write_csv(rows)
}

/// The officials' dashboard state: held filters plus fetch, summarize
/// and export over them.
pub struct MinistryView<S> {
    store: Arc<S>,
    filters: CorrelationFilters,
}

impl<S: ProblemStore> MinistryView<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            filters: CorrelationFilters::default(),
        }
    }

    pub fn filters(&self) -> &CorrelationFilters {
        &self.filters
    }

    /// Set the city filter. An empty string clears it.
    pub fn set_city(&mut self, city: &str) {
        self.filters.set_city(city);
    }

    /// Set the category filter. An empty list clears it.
    pub fn set_categories(&mut self, categories: Vec<ProblemCategory>) {
        self.filters.set_categories(categories);
    }

    pub fn set_date_range(&mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) {
        self.filters.set_date_range(from, to);
    }

    /// Correlation rows for the current filters.
    pub async fn correlations(&self) -> Result<Vec<Correlation>, VoiceUpError> {
        self.store.fetch_correlations(&self.filters).await
    }

    pub async fn summary(&self) -> Result<CorrelationSummary, VoiceUpError> {
        Ok(summarize(&self.correlations().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlation(a: &str, b: &str, score: f64) -> Correlation {
        Correlation {
            category_a: a.to_string(),
            category_b: b.to_string(),
            city: "Pune".to_string(),
            correlation_score: score,
        }
    }

    #[test]
    fn top_correlation_keeps_first_on_ties() {
        let rows = vec![
            correlation("roads", "water", 0.8),
            correlation("safety", "roads", 0.8),
            correlation("water", "sanitation", 0.3),
        ];
        let top = top_correlation(&rows).unwrap();
        assert_eq!(top.category_a, "roads");
    }

    #[test]
    fn top_correlation_of_empty_is_none() {
        assert!(top_correlation(&[]).is_none());
    }

    #[test]
    fn summarize_averages_scores() {
        let rows = vec![
            correlation("roads", "water", 0.2),
            correlation("safety", "roads", 0.6),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.total, 2);
        assert!((summary.average_score - 0.4).abs() < 1e-9);
        assert_eq!(summary.top.unwrap().correlation_score, 0.6);
    }

    #[test]
    fn summarize_empty_is_zeroed() {
        let summary = summarize(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average_score, 0.0);
        assert!(summary.top.is_none());
    }

    #[test]
    fn export_of_no_rows_is_empty() {
        assert_eq!(export_csv(&[]), "");
    }

    #[test]
    fn export_has_header_and_rows() {
        let rows = vec![correlation("roads", "water", 0.75)];
        let csv = export_csv(&rows);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("category_a,category_b,city,correlation_score")
        );
        assert_eq!(lines.next(), Some("roads,water,Pune,0.75"));
        assert_eq!(lines.next(), None);
    }
}
