use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::geo;

// --- Geo Types ---

/// Canonical coordinates. Every location encoding the backend can return
/// resolves to this or to nothing, never to a lone latitude or longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCategory {
    Roads,
    Water,
    Electricity,
    Sanitation,
    Safety,
    Other,
}

impl std::fmt::Display for ProblemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemCategory::Roads => write!(f, "roads"),
            ProblemCategory::Water => write!(f, "water"),
            ProblemCategory::Electricity => write!(f, "electricity"),
            ProblemCategory::Sanitation => write!(f, "sanitation"),
            ProblemCategory::Safety => write!(f, "safety"),
            ProblemCategory::Other => write!(f, "other"),
        }
    }
}

impl ProblemCategory {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "roads" => Self::Roads,
            "water" => Self::Water,
            "electricity" => Self::Electricity,
            "sanitation" => Self::Sanitation,
            "safety" => Self::Safety,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemStatus {
    Reported,
    InProgress,
    Resolved,
    Rejected,
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemStatus::Reported => write!(f, "reported"),
            ProblemStatus::InProgress => write!(f, "in_progress"),
            ProblemStatus::Resolved => write!(f, "resolved"),
            ProblemStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl ProblemStatus {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "resolved" => Self::Resolved,
            "rejected" => Self::Rejected,
            _ => Self::Reported,
        }
    }
}

/// A cast vote. Absence means the viewer has not voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteKind::Upvote => write!(f, "upvote"),
            VoteKind::Downvote => write!(f, "downvote"),
        }
    }
}

// --- Problems ---

/// A problem row exactly as the backend returns it. Columns can be missing,
/// null, or loosely typed; the proximity RPC additionally returns a
/// polymorphic `location` column. Never exposed past `Problem::from_row`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemRow {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub location: Option<Value>,
    pub votes_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub pincode: Option<String>,
}

/// The canonical problem shape the UI surfaces consume.
///
/// The wire form is flat: nullable `latitude`/`longitude` floats, never a
/// nested coordinates object.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ProblemCategory,
    pub status: ProblemStatus,
    pub created_at: DateTime<Utc>,
    pub coordinates: Option<GeoPoint>,
    pub votes_count: i64,
    pub comments_count: i64,
    pub pincode: Option<String>,
    /// The current viewer's vote, filled in by the vote merge step.
    pub user_vote: Option<VoteKind>,
}

impl Problem {
    /// Convert a raw row into the canonical shape: fill the defaults the
    /// UI relies on and resolve coordinates through the geo normalizer.
    pub fn from_row(row: ProblemRow) -> Self {
        let coordinates = geo::normalize_location(
            row.latitude.as_ref(),
            row.longitude.as_ref(),
            row.location.as_ref(),
        );

        Self {
            id: row.id.unwrap_or_else(Uuid::new_v4),
            title: row.title.unwrap_or_else(|| "Untitled problem".to_string()),
            description: row.description.unwrap_or_default(),
            category: row
                .category
                .as_deref()
                .map(ProblemCategory::from_str_loose)
                .unwrap_or(ProblemCategory::Other),
            status: row
                .status
                .as_deref()
                .map(ProblemStatus::from_str_loose)
                .unwrap_or(ProblemStatus::Reported),
            created_at: row.created_at.unwrap_or_else(Utc::now),
            coordinates,
            votes_count: row.votes_count.unwrap_or(0),
            comments_count: row.comments_count.unwrap_or(0),
            pincode: row.pincode,
            user_vote: None,
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.lat)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.lng)
    }
}

impl Serialize for Problem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Problem", 12)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", &self.title)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("category", &self.category)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("latitude", &self.latitude())?;
        state.serialize_field("longitude", &self.longitude())?;
        state.serialize_field("votes_count", &self.votes_count)?;
        state.serialize_field("comments_count", &self.comments_count)?;
        state.serialize_field("pincode", &self.pincode)?;
        state.serialize_field("user_vote", &self.user_vote)?;
        state.end()
    }
}

/// The flat wire shape `Problem` deserializes from.
#[derive(Deserialize)]
struct ProblemWire {
    id: Uuid,
    title: String,
    description: String,
    category: ProblemCategory,
    status: ProblemStatus,
    created_at: DateTime<Utc>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    votes_count: i64,
    comments_count: i64,
    #[serde(default)]
    pincode: Option<String>,
    #[serde(default)]
    user_vote: Option<VoteKind>,
}

impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = ProblemWire::deserialize(deserializer)?;
        // One-sided coordinates never survive the wire.
        let coordinates = match (wire.latitude, wire.longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };
        Ok(Self {
            id: wire.id,
            title: wire.title,
            description: wire.description,
            category: wire.category,
            status: wire.status,
            created_at: wire.created_at,
            coordinates,
            votes_count: wire.votes_count,
            comments_count: wire.comments_count,
            pincode: wire.pincode,
            user_vote: wire.user_vote,
        })
    }
}

// --- Votes ---

/// Net vote total per problem, from the server-side aggregation.
/// Absence of an entry means zero.
pub type VoteTotals = HashMap<Uuid, i64>;

/// The current viewer's vote per problem. Absent entirely for
/// unauthenticated viewers.
pub type ViewerVotes = HashMap<Uuid, VoteKind>;

// --- Contribution & Impact ---

/// Exact per-user contribution counts, each independently fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionMetrics {
    pub reports_count: u64,
    pub comments_count: u64,
    pub votes_count: u64,
}

/// Derived gamification state: the metrics snapshot it was computed from,
/// the point score, and the accumulated badge set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactStats {
    pub reports_count: u64,
    pub comments_count: u64,
    pub votes_count: u64,
    pub points: u64,
    pub badges: Vec<String>,
}

// --- Profiles ---

/// A profile row as stored. Older rows carry `user_id`/`username` instead
/// of `id`/`full_name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub points: Option<u64>,
    pub badges: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub points: u64,
    pub badges: Vec<String>,
}

impl Profile {
    /// Normalize a stored row, falling back to the legacy column names and
    /// then to the session's user id and the "Citizen" display name.
    pub fn from_row(row: ProfileRow, session_user: Uuid) -> Self {
        Self {
            id: row.id.or(row.user_id).unwrap_or(session_user),
            full_name: row
                .full_name
                .or(row.username)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Citizen".to_string()),
            points: row.points.unwrap_or(0),
            badges: row.badges.unwrap_or_default(),
        }
    }
}

// --- Ministry correlations ---

/// One category-pair correlation row for the officials' view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub category_a: String,
    pub category_b: String,
    pub city: String,
    pub correlation_score: f64,
}

/// Ministry view filters. Setting an empty value clears that filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationFilters {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub categories: Vec<ProblemCategory>,
    pub city: Option<String>,
}

impl CorrelationFilters {
    pub fn set_date_range(&mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) {
        self.date_from = from;
        self.date_to = to;
    }

    pub fn set_categories(&mut self, categories: Vec<ProblemCategory>) {
        self.categories = categories;
    }

    pub fn set_city(&mut self, city: &str) {
        self.city = if city.is_empty() {
            None
        } else {
            Some(city.to_string())
        };
    }

    pub fn is_empty(&self) -> bool {
        self.date_from.is_none()
            && self.date_to.is_none()
            && self.categories.is_empty()
            && self.city.is_none()
    }
}
