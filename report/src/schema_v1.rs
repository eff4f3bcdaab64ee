//! AER structural contract, expressed as an `aer_kernel::schema` tree.
//!
//! The generator validates every body against this contract before handing
//! out bytes, and the verifier validates untrusted JSON against it again.

use aer_kernel::schema::{validate, Field, Schema, Violation};
use serde_json::Value;

/// Versions of the AER body contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    V1,
}

/// A body declared a contract version this build does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown AER schema version: {version:?}")]
pub struct UnknownSchemaVersion {
    pub version: String,
}

impl SchemaVersion {
    /// # Errors
    ///
    /// Returns [`UnknownSchemaVersion`] for anything but `"v1"`.
    pub fn parse(s: &str) -> Result<Self, UnknownSchemaVersion> {
        match s {
            "v1" => Ok(Self::V1),
            other => Err(UnknownSchemaVersion {
                version: other.to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }

    /// The contract tree for this version.
    #[must_use]
    pub fn schema(self) -> Schema {
        match self {
            Self::V1 => aer_v1(),
        }
    }
}

fn opt_string() -> Schema {
    Schema::nullable(Schema::string())
}

fn opt_timestamp() -> Schema {
    Schema::nullable(Schema::timestamp())
}

fn actor() -> Schema {
    Schema::closed(vec![
        Field::required("user_id", opt_string()),
        Field::required("name", opt_string()),
    ])
}

fn meta() -> Schema {
    Schema::closed(vec![
        Field::required("report_type", Schema::constant("AER")),
        Field::required("version", Schema::constant("v1")),
        Field::required("generated_at", Schema::timestamp()),
        Field::required(
            "period",
            Schema::closed(vec![
                Field::required("start", Schema::date()),
                Field::required("end", Schema::date()),
            ]),
        ),
        Field::required("clinic_id", Schema::non_empty()),
        Field::required("client_id", Schema::non_empty()),
        Field::required("program", Schema::nullable(Schema::non_empty())),
        Field::required(
            "generated_by",
            Schema::closed(vec![
                Field::required("type", Schema::constant("system")),
                Field::required("id", Schema::non_empty()),
            ]),
        ),
    ])
}

fn context() -> Schema {
    Schema::closed(vec![
        Field::required(
            "clinic",
            Schema::closed(vec![Field::required("name", opt_string())]),
        ),
        Field::required(
            "client",
            Schema::closed(vec![Field::required("display_id", opt_string())]),
        ),
    ])
}

fn intervention() -> Schema {
    let library_source = Schema::closed(vec![
        Field::required("item_id", Schema::non_empty()),
        Field::required("version_id", opt_string()),
        Field::required("version", Schema::nullable(Schema::Integer { min: None })),
        Field::required("title", opt_string()),
        Field::required("slug", opt_string()),
        Field::required("content_type", opt_string()),
        Field::required("status", Schema::constant("PUBLISHED")),
    ]);
    Schema::closed(vec![
        Field::required("assignment_id", Schema::non_empty()),
        Field::required("title", opt_string()),
        Field::required("library_source", Schema::nullable(library_source)),
        Field::required("assigned_by", actor()),
        Field::required("assigned_at", opt_timestamp()),
        Field::required(
            "due",
            Schema::closed(vec![
                Field::required("start", opt_timestamp()),
                Field::required("end", opt_timestamp()),
            ]),
        ),
        Field::required("completion_criteria", opt_string()),
        Field::required("completed_at", opt_timestamp()),
        Field::required("reviewed_at", opt_timestamp()),
        Field::required("reviewed_by", actor()),
        Field::required("evidence_refs", Schema::array(Schema::non_empty())),
        Field::required(
            "status_summary",
            Schema::closed(vec![
                Field::required("completed", Schema::count()),
                Field::required("partial", Schema::count()),
                Field::required("missed", Schema::count()),
                Field::required("late", Schema::count()),
            ]),
        ),
    ])
}

fn timeline_event() -> Schema {
    Schema::closed(vec![
        Field::required("ts", Schema::timestamp()),
        Field::required(
            "type",
            Schema::one_of(&[
                "assignment_completed",
                "assignment_partial",
                "assignment_missed",
                "checkin",
                "feedback",
                "notification_sent",
                "other",
            ]),
        ),
        Field::required("source", Schema::one_of(&["client", "system", "clinician"])),
        Field::required(
            "ref",
            Schema::closed(vec![
                Field::required("assignment_id", opt_string()),
                Field::required("response_id", opt_string()),
            ]),
        ),
        Field::required("details", Schema::AnyObject),
    ])
}

fn escalation() -> Schema {
    Schema::closed(vec![
        Field::required("ts", Schema::timestamp()),
        Field::required("type", Schema::one_of(&["reminder", "escalation"])),
        Field::required(
            "channel",
            Schema::one_of(&["email", "sms", "inapp", "unknown"]),
        ),
        Field::required("details", Schema::AnyObject),
    ])
}

fn aer_v1() -> Schema {
    Schema::closed(vec![
        Field::required("meta", meta()),
        Field::required("context", context()),
        Field::required("prescribed_interventions", Schema::array(intervention())),
        Field::required("adherence_timeline", Schema::array(timeline_event())),
        Field::required("noncompliance_escalations", Schema::array(escalation())),
        Field::required(
            "clinician_review",
            Schema::closed(vec![
                Field::required("reviewed", Schema::Bool),
                Field::required("reviewed_at", opt_timestamp()),
                Field::required("reviewed_by", actor()),
                Field::required("notes", opt_string()),
            ]),
        ),
        Field::required(
            "audit_integrity",
            Schema::closed(vec![
                Field::required("data_sources", Schema::array(Schema::non_empty())),
                Field::required("notes", Schema::string()),
                Field::required("report_id", Schema::non_empty()),
                Field::required("hash", opt_string()),
            ]),
        ),
        Field::required("not_available", Schema::array(Schema::non_empty())),
    ])
}

/// Validate a decoded body against an explicit contract version.
///
/// # Errors
///
/// Returns every violation found.
pub fn validate_body(value: &Value, version: SchemaVersion) -> Result<(), Vec<Violation>> {
    validate(value, &version.schema())
}

/// Validate a decoded body against the version it declares in `meta.version`.
///
/// A missing or unknown version is reported as a violation at `/meta/version`.
///
/// # Errors
///
/// Returns every violation found.
pub fn validate_declared(value: &Value) -> Result<(), Vec<Violation>> {
    let declared = value
        .get("meta")
        .and_then(|m| m.get("version"))
        .and_then(Value::as_str);
    match declared.map(SchemaVersion::parse) {
        Some(Ok(version)) => validate_body(value, version),
        Some(Err(e)) => Err(vec![Violation {
            path: "/meta/version".to_string(),
            message: e.to_string(),
        }]),
        None => Err(vec![Violation {
            path: "/meta/version".to_string(),
            message: "required field is missing".to_string(),
        }]),
    }
}
