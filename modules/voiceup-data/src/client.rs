//! Thin REST client for the managed data backend.
//!
//! Speaks the backend's PostgREST surface directly: table reads, RPC
//! calls and exact-count HEAD requests. Responses come back as wire rows;
//! normalization happens in `voiceup-common`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use serde::Deserialize;
use serde_json::json;
use url::Url;
use uuid::Uuid;

use voiceup_common::{
    Config, ContributionMetrics, Correlation, CorrelationFilters, ProblemRow, ProfileRow,
    ViewerVotes, VoiceUpError, VoteKind, VoteTotals,
};

use crate::realtime::{ChangeMarker, ChangeMarkerSource, Entity};
use crate::store::ProblemStore;

/// One row of the `problem_vote_totals` aggregate view.
#[derive(Debug, Deserialize)]
struct VoteTotalRow {
    problem_id: Option<Uuid>,
    net_votes: Option<i64>,
}

/// One row of the viewer's own-votes query.
#[derive(Debug, Deserialize)]
struct ViewerVoteRow {
    votable_id: Option<Uuid>,
    vote_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdatedAtRow {
    updated_at: Option<DateTime<Utc>>,
}

pub struct DataClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl DataClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, VoiceUpError> {
        // Url::join treats the last path segment as a file unless the base
        // ends with a slash.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| VoiceUpError::Config(format!("invalid backend URL: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, VoiceUpError> {
        Self::new(&config.backend_url, &config.backend_api_key)
    }

    fn headers(&self) -> Result<HeaderMap, VoiceUpError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| VoiceUpError::Config(format!("invalid API key: {e}")))?;
        headers.insert("apikey", key);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| VoiceUpError::Config(format!("invalid API key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn table_url(&self, path: &str) -> Result<Url, VoiceUpError> {
        self.base_url
            .join(&format!("rest/v1/{path}"))
            .map_err(|e| VoiceUpError::Config(format!("invalid request path {path}: {e}")))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, VoiceUpError> {
        let response = self
            .http
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| VoiceUpError::Fetch(e.to_string()))?;
        Self::parse_json(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        body: &serde_json::Value,
    ) -> Result<T, VoiceUpError> {
        let response = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| VoiceUpError::Fetch(e.to_string()))?;
        Self::parse_json(response).await
    }

    async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, VoiceUpError> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| VoiceUpError::Fetch(e.to_string()))?;
            return Err(VoiceUpError::Fetch(format!(
                "backend request failed ({status}): {text}"
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| VoiceUpError::Fetch(format!("malformed backend response: {e}")))
    }

    /// Exact row count without fetching rows: a HEAD request with
    /// `Prefer: count=exact`, total read from the Content-Range header.
    async fn exact_count(&self, table: &str, user_filter: Option<Uuid>) -> Result<u64, VoiceUpError> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "id");
            if let Some(user) = user_filter {
                pairs.append_pair("user_id", &format!("eq.{user}"));
            }
        }
        let mut headers = self.headers()?;
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));
        headers.insert(RANGE, HeaderValue::from_static("0-0"));
        let response = self
            .http
            .head(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| VoiceUpError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(VoiceUpError::Fetch(format!(
                "count request for {table} failed ({status})"
            )));
        }
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| {
                VoiceUpError::Fetch(format!("count response for {table} missing Content-Range"))
            })
    }
}

#[async_trait]
impl ProblemStore for DataClient {
    async fn fetch_problems(&self) -> Result<Vec<ProblemRow>, VoiceUpError> {
        let mut url = self.table_url("problems")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("is_flagged", "eq.false")
            .append_pair("order", "created_at.desc");
        self.get_json(url).await
    }

    async fn fetch_nearby(&self, lat: f64, lng: f64) -> Result<Vec<ProblemRow>, VoiceUpError> {
        let url = self.table_url("rpc/nearby_problems")?;
        self.post_json(url, &json!({ "lat": lat, "lng": lng })).await
    }

    async fn fetch_problem_count(&self) -> Result<u64, VoiceUpError> {
        self.exact_count("problems", None).await
    }

    async fn fetch_vote_totals(&self) -> Result<VoteTotals, VoiceUpError> {
        let mut url = self.table_url("problem_vote_totals")?;
        url.query_pairs_mut()
            .append_pair("select", "problem_id,net_votes");
        let rows: Vec<VoteTotalRow> = self.get_json(url).await?;
        Ok(fold_vote_totals(rows))
    }

    async fn fetch_viewer_votes(&self, viewer: Uuid) -> Result<ViewerVotes, VoiceUpError> {
        let mut url = self.table_url("votes")?;
        url.query_pairs_mut()
            .append_pair("select", "votable_id,vote_type")
            .append_pair("user_id", &format!("eq.{viewer}"))
            .append_pair("votable_type", "eq.problem");
        let rows: Vec<ViewerVoteRow> = self.get_json(url).await?;
        Ok(fold_viewer_votes(rows))
    }

    async fn fetch_contribution_metrics(
        &self,
        user: Uuid,
    ) -> Result<ContributionMetrics, VoiceUpError> {
        let (reports_count, comments_count, votes_count) = tokio::try_join!(
            self.exact_count("problems", Some(user)),
            self.exact_count("comments", Some(user)),
            self.exact_count("votes", Some(user)),
        )?;
        Ok(ContributionMetrics {
            reports_count,
            comments_count,
            votes_count,
        })
    }

    async fn fetch_profile(&self, user: Uuid) -> Result<Option<ProfileRow>, VoiceUpError> {
        let mut url = self.table_url("profiles")?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{user}"));
        let rows: Vec<ProfileRow> = self.get_json(url).await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_correlations(
        &self,
        filters: &CorrelationFilters,
    ) -> Result<Vec<Correlation>, VoiceUpError> {
        let url = self.table_url("rpc/category_correlations")?;
        let body = serde_json::to_value(filters)
            .map_err(|e| VoiceUpError::Fetch(format!("unencodable correlation filters: {e}")))?;
        self.post_json(url, &body).await
    }
}

#[async_trait]
impl ChangeMarkerSource for DataClient {
    /// Backend tables set `updated_at` on insert and bump it on update, so
    /// the newest `updated_at` moves on edits that change no row count
    /// (a vote flipped in place, an edited description).
    async fn change_marker(&self, entity: Entity) -> Result<ChangeMarker, VoiceUpError> {
        let table = entity.to_string();
        let row_count = self.exact_count(&table, None).await?;

        let mut url = self.table_url(&table)?;
        url.query_pairs_mut()
            .append_pair("select", "updated_at")
            .append_pair("order", "updated_at.desc.nullslast")
            .append_pair("limit", "1");
        let rows: Vec<UpdatedAtRow> = self.get_json(url).await?;
        let latest_change_at = rows.into_iter().next().and_then(|row| row.updated_at);

        Ok(ChangeMarker {
            row_count,
            latest_change_at,
        })
    }
}

fn fold_vote_totals(rows: Vec<VoteTotalRow>) -> VoteTotals {
    rows.into_iter()
        .filter_map(|row| Some((row.problem_id?, row.net_votes.unwrap_or(0))))
        .collect()
}

fn fold_viewer_votes(rows: Vec<ViewerVoteRow>) -> ViewerVotes {
    rows.into_iter()
        .filter_map(|row| {
            let kind = match row.vote_type.as_deref() {
                Some("upvote") => VoteKind::Upvote,
                Some("downvote") => VoteKind::Downvote,
                _ => return None,
            };
            Some((row.votable_id?, kind))
        })
        .collect()
}

fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-9/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn vote_totals_skip_rows_without_problem_id() {
        let id = Uuid::new_v4();
        let totals = fold_vote_totals(vec![
            VoteTotalRow {
                problem_id: Some(id),
                net_votes: Some(4),
            },
            VoteTotalRow {
                problem_id: None,
                net_votes: Some(9),
            },
        ]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals.get(&id), Some(&4));
    }

    #[test]
    fn vote_totals_default_missing_net_to_zero() {
        let id = Uuid::new_v4();
        let totals = fold_vote_totals(vec![VoteTotalRow {
            problem_id: Some(id),
            net_votes: None,
        }]);
        assert_eq!(totals.get(&id), Some(&0));
    }

    #[test]
    fn viewer_votes_skip_unknown_vote_types() {
        let up = Uuid::new_v4();
        let down = Uuid::new_v4();
        let odd = Uuid::new_v4();
        let votes = fold_viewer_votes(vec![
            ViewerVoteRow {
                votable_id: Some(up),
                vote_type: Some("upvote".to_string()),
            },
            ViewerVoteRow {
                votable_id: Some(down),
                vote_type: Some("downvote".to_string()),
            },
            ViewerVoteRow {
                votable_id: Some(odd),
                vote_type: Some("sideways".to_string()),
            },
            ViewerVoteRow {
                votable_id: None,
                vote_type: Some("upvote".to_string()),
            },
        ]);
        assert_eq!(votes.len(), 2);
        assert_eq!(votes.get(&up), Some(&VoteKind::Upvote));
        assert_eq!(votes.get(&down), Some(&VoteKind::Downvote));
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = DataClient::new("https://backend.example.com", "key").unwrap();
        let url = client.table_url("problems").unwrap();
        assert_eq!(url.as_str(), "https://backend.example.com/rest/v1/problems");
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(DataClient::new("not a url", "key").is_err());
    }
}
