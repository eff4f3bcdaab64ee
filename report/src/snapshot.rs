//! Evidence snapshot: the already-assembled input for one report.
//!
//! A snapshot is provided by an external collaborator and is never mutated or
//! re-queried. Every evidence category is optional: `None` means the category
//! was not available, which the body records as a `not_available` fact rather
//! than failing generation. `Some(vec![])` means the category was available
//! and empty.
//!
//! All numeric fields are integers; a JSON snapshot carrying a float fails to
//! deserialize instead of reaching the canonical writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvidenceSnapshot {
    pub clinic: ClinicRef,
    pub client: ClientRef,
    pub period: PeriodLabels,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub assignments: Option<Vec<AssignmentRecord>>,
    #[serde(default)]
    pub responses: Option<Vec<ResponseRecord>>,
    #[serde(default)]
    pub feedback: Option<Vec<FeedbackRecord>>,
    #[serde(default)]
    pub checkins: Option<Vec<CheckinRecord>>,
    #[serde(default)]
    pub notifications: Option<Vec<NotificationRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientRef {
    pub id: String,
    #[serde(default)]
    pub display_id: Option<String>,
}

/// Period bounds as supplied, before validation (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodLabels {
    pub start: String,
    pub end: String,
}

/// A clinician or staff member referenced by evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonRef {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignmentRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Title of the prompt the assignment was built from; used when `title` is absent.
    #[serde(default)]
    pub prompt_title: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub library_source: Option<LibrarySource>,
    #[serde(default)]
    pub assigned_by: Option<PersonRef>,
}

/// Published library item an assignment was instantiated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibrarySource {
    pub item_id: String,
    #[serde(default)]
    pub version_id: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseRecord {
    pub id: String,
    pub assignment_id: String,
    pub created_at: DateTime<Utc>,
    pub mood: i64,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<PersonRef>,
    #[serde(default)]
    pub flagged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub starred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRecord {
    pub response_id: String,
    pub assignment_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub therapist: Option<PersonRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckinRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub mood: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub dedupe_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EvidenceSnapshot {
    /// Snapshot with identity and period but no evidence categories at all.
    #[must_use]
    pub fn bare(clinic_id: &str, client_id: &str, start: &str, end: &str) -> Self {
        Self {
            clinic: ClinicRef {
                id: clinic_id.to_string(),
                name: None,
            },
            client: ClientRef {
                id: client_id.to_string(),
                display_id: None,
            },
            period: PeriodLabels {
                start: start.to_string(),
                end: end.to_string(),
            },
            program: None,
            assignments: None,
            responses: None,
            feedback: None,
            checkins: None,
            notifications: None,
        }
    }

    /// Parse a snapshot from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input, unknown fields, or
    /// non-integer numbers.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
