use super::camera_models::CameraSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Thumbnail used when an incident is created without one
pub const DEFAULT_THUMBNAIL_URL: &str = "/api/placeholder/200/120";

/// Incident type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IncidentType {
    #[serde(rename = "Unauthorised Access")]
    UnauthorisedAccess,
    #[serde(rename = "Gun Threat")]
    GunThreat,
    #[serde(rename = "Face Recognised")]
    FaceRecognised,
}

impl IncidentType {
    pub const ALL: [IncidentType; 3] = [
        IncidentType::UnauthorisedAccess,
        IncidentType::GunThreat,
        IncidentType::FaceRecognised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::UnauthorisedAccess => "Unauthorised Access",
            IncidentType::GunThreat => "Gun Threat",
            IncidentType::FaceRecognised => "Face Recognised",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown incident type: {}", s))
    }
}

// Stored as TEXT guarded by a CHECK constraint
impl sqlx::Type<sqlx::Postgres> for IncidentType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for IncidentType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let text = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(text.parse::<IncidentType>()?)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for IncidentType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

/// Incident model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: i32,
    pub camera_id: i32,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub ts_start: DateTime<Utc>,
    pub ts_end: DateTime<Utc>,
    pub thumbnail_url: String,
    pub resolved: bool,
}

/// Row shape of the incident/camera join
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IncidentRow {
    #[sqlx(flatten)]
    pub incident: Incident,
    pub camera_name: String,
    pub camera_location: String,
}

/// Incident as returned by the API, with its camera attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentWithCamera {
    #[serde(flatten)]
    pub incident: Incident,
    pub camera: CameraSummary,
}

impl From<IncidentRow> for IncidentWithCamera {
    fn from(row: IncidentRow) -> Self {
        let camera = CameraSummary {
            id: row.incident.camera_id,
            name: row.camera_name,
            location: row.camera_location,
        };
        Self {
            incident: row.incident,
            camera,
        }
    }
}

/// Validated payload for a new incident, defaults already applied
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub camera_id: i32,
    pub incident_type: IncidentType,
    pub ts_start: DateTime<Utc>,
    pub ts_end: DateTime<Utc>,
    pub thumbnail_url: String,
    pub resolved: bool,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentChanges {
    pub camera_id: Option<i32>,
    pub incident_type: Option<IncidentType>,
    pub ts_start: Option<DateTime<Utc>>,
    pub ts_end: Option<DateTime<Utc>>,
    pub thumbnail_url: Option<String>,
    pub resolved: Option<bool>,
}

impl IncidentChanges {
    pub fn is_empty(&self) -> bool {
        *self == IncidentChanges::default()
    }

    /// Apply the changes to an in-memory copy of the record
    pub fn apply_to(&self, incident: &mut Incident) {
        if let Some(camera_id) = self.camera_id {
            incident.camera_id = camera_id;
        }
        if let Some(incident_type) = self.incident_type {
            incident.incident_type = incident_type;
        }
        if let Some(ts_start) = self.ts_start {
            incident.ts_start = ts_start;
        }
        if let Some(ts_end) = self.ts_end {
            incident.ts_end = ts_end;
        }
        if let Some(thumbnail_url) = &self.thumbnail_url {
            incident.thumbnail_url = thumbnail_url.clone();
        }
        if let Some(resolved) = self.resolved {
            incident.resolved = resolved;
        }
    }
}

/// Filters for the incident list; all present filters must match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    pub resolved: Option<bool>,
    pub camera_id: Option<i32>,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        self.resolved.map_or(true, |r| incident.resolved == r)
            && self.camera_id.map_or(true, |c| incident.camera_id == c)
    }
}

/// Ordering of the incident list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncidentOrder {
    /// Identifier order, ascending
    #[default]
    Id,
    /// Most recent `ts_start` first, ties broken by descending id
    RecentFirst,
}

impl IncidentOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            IncidentOrder::Id => "i.id ASC",
            IncidentOrder::RecentFirst => "i.ts_start DESC, i.id DESC",
        }
    }

    pub fn sort(&self, incidents: &mut [Incident]) {
        match self {
            IncidentOrder::Id => incidents.sort_by_key(|i| i.id),
            IncidentOrder::RecentFirst => {
                incidents.sort_by(|a, b| b.ts_start.cmp(&a.ts_start).then(b.id.cmp(&a.id)))
            }
        }
    }
}

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = i64::from(self.limit);
        (total + limit - 1) / limit
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: self.total_pages(total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// A page of the filtered incident list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentPage {
    pub incidents: Vec<IncidentWithCamera>,
    pub pagination: Pagination,
}

/// Dashboard counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
    pub total_cameras: i64,
    pub total_incidents: i64,
    pub unresolved_incidents: i64,
    pub incidents_by_type: BTreeMap<IncidentType, i64>,
    pub last_updated: DateTime<Utc>,
}
