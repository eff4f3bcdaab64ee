//! AER v1 report body and its derivation from an evidence snapshot.
//!
//! Derivation is a pure function of `(snapshot, selector)`. Every collection
//! in the body is explicitly ordered, so the canonical bytes do not depend on
//! the order in which the snapshot provider listed its records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identity::{ReportKind, ReportSelector};
use crate::period::{format_instant, ReportPeriod};
use crate::snapshot::{AssignmentRecord, EvidenceSnapshot, PersonRef, ResponseRecord};

/// Contract version written to `meta.version`.
pub const BODY_VERSION: &str = "v1";

/// Notification kinds that count as reminders in `noncompliance_escalations`.
pub const REMINDER_NOTIFICATION_KINDS: [&str; 2] =
    ["assignment_due_24h", "assignment_manual_reminder"];

const AUDIT_NOTES: &str =
    "This report is generated from system-of-record event data where available.";

const NA_PROGRAM_FILTER: &str = "program filter (no program field to filter assignments/clients)";
const NA_DISPLAY_ID: &str = "context.client.display_id (no display_id in clients table)";
const NA_FIXED: [&str; 5] = [
    "prescribed_interventions.completion_criteria (no field in assignments/prompts)",
    "prescribed_interventions.status_summary.partial (no partial completion model)",
    "clinician_review.notes (no review notes model)",
    "noncompliance_escalations.channel (delivery channel not stored)",
    "audit_integrity.hash (not implemented in v1)",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AerBody {
    pub meta: Meta,
    pub context: Context,
    pub prescribed_interventions: Vec<Intervention>,
    pub adherence_timeline: Vec<TimelineEvent>,
    pub noncompliance_escalations: Vec<Escalation>,
    pub clinician_review: ClinicianReview,
    pub audit_integrity: AuditIntegrity,
    pub not_available: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub report_type: String,
    pub version: String,
    pub generated_at: String,
    pub period: PeriodOut,
    pub clinic_id: String,
    pub client_id: String,
    pub program: Option<String>,
    pub generated_by: GeneratedBy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodOut {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedBy {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Context {
    pub clinic: ClinicContext,
    pub client: ClientContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicContext {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientContext {
    pub display_id: Option<String>,
}

/// Person reference as written into the body; both halves may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: Option<String>,
    pub name: Option<String>,
}

impl Actor {
    fn from_ref(person: Option<&PersonRef>) -> Self {
        person.map_or_else(Self::default, |p| Self {
            user_id: Some(p.user_id.clone()),
            name: p.name.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intervention {
    pub assignment_id: String,
    pub title: Option<String>,
    pub library_source: Option<LibrarySourceOut>,
    pub assigned_by: Actor,
    pub assigned_at: Option<String>,
    pub due: DueWindow,
    pub completion_criteria: Option<String>,
    pub completed_at: Option<String>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Actor,
    pub evidence_refs: Vec<String>,
    pub status_summary: StatusSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySourceOut {
    pub item_id: String,
    pub version_id: Option<String>,
    pub version: Option<i64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content_type: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DueWindow {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Per-assignment counters. Each is `0` or `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub completed: u8,
    pub partial: u8,
    pub missed: u8,
    pub late: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineType {
    AssignmentCompleted,
    AssignmentMissed,
    Checkin,
    Feedback,
    NotificationSent,
}

impl TimelineType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssignmentCompleted => "assignment_completed",
            Self::AssignmentMissed => "assignment_missed",
            Self::Checkin => "checkin",
            Self::Feedback => "feedback",
            Self::NotificationSent => "notification_sent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Client,
    System,
    Clinician,
}

impl EventSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::System => "system",
            Self::Clinician => "clinician",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct EventRef {
    pub assignment_id: Option<String>,
    pub response_id: Option<String>,
}

/// Event-specific details, serialized as a flat object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventDetails {
    Completion {
        mood: i64,
        reviewed_at: Option<String>,
        flagged_at: Option<String>,
        starred_at: Option<String>,
        late: bool,
    },
    Checkin {
        checkin_id: String,
        mood: i64,
    },
    Feedback {
        therapist_user_id: Option<String>,
        therapist_name: Option<String>,
    },
    Notification {
        notification_type: String,
    },
    Missed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    pub ts: String,
    #[serde(rename = "type")]
    pub kind: TimelineType,
    pub source: EventSource,
    #[serde(rename = "ref")]
    pub reference: EventRef,
    pub details: EventDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationType {
    Reminder,
    Escalation,
}

impl EscalationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Escalation => "escalation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
    Inapp,
    Unknown,
}

impl Channel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Inapp => "inapp",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalationDetails {
    pub notification_type: String,
    pub assignment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Escalation {
    pub ts: String,
    #[serde(rename = "type")]
    pub kind: EscalationType,
    pub channel: Channel,
    pub details: EscalationDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicianReview {
    pub reviewed: bool,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Actor,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditIntegrity {
    pub data_sources: Vec<String>,
    pub notes: String,
    pub report_id: String,
    pub hash: Option<String>,
}

/// Ordered, de-duplicated list of "not available" facts.
#[derive(Debug, Default)]
struct NotAvailable(Vec<String>);

impl NotAvailable {
    fn add(&mut self, entry: &str) {
        if !self.0.iter().any(|e| e == entry) {
            self.0.push(entry.to_string());
        }
    }
}

/// Extract `<id>` from a notification dedupe key of the form `...assignment:<id>:...`.
#[must_use]
pub fn parse_assignment_id(dedupe_key: Option<&str>) -> Option<String> {
    const MARKER: &str = "assignment:";
    let key = dedupe_key?;
    key.match_indices(MARKER).find_map(|(i, _)| {
        let rest = &key[i + MARKER.len()..];
        match rest.find(':') {
            Some(end) if end > 0 => Some(rest[..end].to_string()),
            _ => None,
        }
    })
}

fn iso(ts: Option<&DateTime<Utc>>) -> Option<String> {
    ts.map(format_instant)
}

fn in_period(period: &ReportPeriod, ts: Option<&DateTime<Utc>>) -> bool {
    ts.is_some_and(|t| period.contains(t))
}

/// Derive the AER v1 body for `selector` from `snapshot`.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn derive_body(snapshot: &EvidenceSnapshot, selector: &ReportSelector) -> AerBody {
    let period = &selector.period;
    let mut not_available = NotAvailable::default();

    if selector.program.is_some() {
        not_available.add(NA_PROGRAM_FILTER);
    }
    if snapshot.client.display_id.is_none() {
        not_available.add(NA_DISPLAY_ID);
    }
    for entry in NA_FIXED {
        not_available.add(entry);
    }

    let categories = [
        ("assignments", snapshot.assignments.is_some()),
        ("responses", snapshot.responses.is_some()),
        ("feedback", snapshot.feedback.is_some()),
        ("checkins", snapshot.checkins.is_some()),
        ("notifications", snapshot.notifications.is_some()),
    ];
    let mut data_sources = Vec::new();
    for (name, present) in categories {
        if present {
            data_sources.push(name.to_string());
        } else {
            not_available.add(&format!("{name} (evidence category not provided)"));
        }
    }

    let all_responses = snapshot.responses.as_deref().unwrap_or_default();
    let responses: Vec<&ResponseRecord> = all_responses
        .iter()
        .filter(|r| period.contains(&r.created_at))
        .collect();

    let assignments: Vec<&AssignmentRecord> = snapshot
        .assignments
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|a| {
            period.contains(&a.created_at)
                || in_period(period, a.published_at.as_ref())
                || in_period(period, a.due_date.as_ref())
                || responses.iter().any(|r| r.assignment_id == a.id)
        })
        .collect();

    let mut prescribed_interventions: Vec<Intervention> = assignments
        .iter()
        .map(|a| derive_intervention(a, &responses, period))
        .collect();
    prescribed_interventions.sort_by(|a, b| {
        (&a.assigned_at, &a.assignment_id).cmp(&(&b.assigned_at, &b.assignment_id))
    });

    let mut adherence_timeline = Vec::new();

    for response in &responses {
        let due = assignments
            .iter()
            .find(|a| a.id == response.assignment_id)
            .and_then(|a| a.due_date);
        let late = due.is_some_and(|d| response.created_at > d);
        adherence_timeline.push(TimelineEvent {
            ts: format_instant(&response.created_at),
            kind: TimelineType::AssignmentCompleted,
            source: EventSource::Client,
            reference: EventRef {
                assignment_id: Some(response.assignment_id.clone()),
                response_id: Some(response.id.clone()),
            },
            details: EventDetails::Completion {
                mood: response.mood,
                reviewed_at: iso(response.reviewed_at.as_ref()),
                flagged_at: iso(response.flagged_at.as_ref()),
                starred_at: iso(response.starred_at.as_ref()),
                late,
            },
        });
    }

    for checkin in snapshot.checkins.as_deref().unwrap_or_default() {
        if !period.contains(&checkin.created_at) {
            continue;
        }
        adherence_timeline.push(TimelineEvent {
            ts: format_instant(&checkin.created_at),
            kind: TimelineType::Checkin,
            source: EventSource::Client,
            reference: EventRef::default(),
            details: EventDetails::Checkin {
                checkin_id: checkin.id.clone(),
                mood: checkin.mood,
            },
        });
    }

    for entry in snapshot.feedback.as_deref().unwrap_or_default() {
        if !period.contains(&entry.created_at) {
            continue;
        }
        let therapist = Actor::from_ref(entry.therapist.as_ref());
        adherence_timeline.push(TimelineEvent {
            ts: format_instant(&entry.created_at),
            kind: TimelineType::Feedback,
            source: EventSource::Clinician,
            reference: EventRef {
                assignment_id: Some(entry.assignment_id.clone()),
                response_id: Some(entry.response_id.clone()),
            },
            details: EventDetails::Feedback {
                therapist_user_id: therapist.user_id,
                therapist_name: therapist.name,
            },
        });
    }

    let notifications: Vec<_> = snapshot
        .notifications
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|n| period.contains(&n.created_at))
        .collect();

    for notification in &notifications {
        adherence_timeline.push(TimelineEvent {
            ts: format_instant(&notification.created_at),
            kind: TimelineType::NotificationSent,
            source: EventSource::System,
            reference: EventRef {
                assignment_id: parse_assignment_id(notification.dedupe_key.as_deref()),
                response_id: None,
            },
            details: EventDetails::Notification {
                notification_type: notification.kind.clone(),
            },
        });
    }

    for intervention in &prescribed_interventions {
        if intervention.status_summary.missed == 1 {
            if let Some(due_end) = &intervention.due.end {
                adherence_timeline.push(TimelineEvent {
                    ts: due_end.clone(),
                    kind: TimelineType::AssignmentMissed,
                    source: EventSource::System,
                    reference: EventRef {
                        assignment_id: Some(intervention.assignment_id.clone()),
                        response_id: None,
                    },
                    details: EventDetails::Missed {
                        reason: "no_response_by_due_date".to_string(),
                    },
                });
            }
        }
    }

    // Timestamps share one fixed-width form, so string order is time order.
    adherence_timeline.sort_by(|a, b| {
        (&a.ts, a.kind.as_str(), &a.reference).cmp(&(&b.ts, b.kind.as_str(), &b.reference))
    });

    let mut noncompliance_escalations: Vec<Escalation> = notifications
        .iter()
        .filter(|n| REMINDER_NOTIFICATION_KINDS.contains(&n.kind.as_str()))
        .map(|n| Escalation {
            ts: format_instant(&n.created_at),
            kind: EscalationType::Reminder,
            channel: Channel::Unknown,
            details: EscalationDetails {
                notification_type: n.kind.clone(),
                assignment_id: parse_assignment_id(n.dedupe_key.as_deref()),
            },
        })
        .collect();
    noncompliance_escalations.sort_by(|a, b| {
        (&a.ts, &a.details.notification_type, &a.details.assignment_id).cmp(&(
            &b.ts,
            &b.details.notification_type,
            &b.details.assignment_id,
        ))
    });

    let latest_review = all_responses
        .iter()
        .filter_map(|r| {
            r.reviewed_at
                .filter(|t| period.contains(t))
                .map(|t| (t, r))
        })
        .max_by(|(ta, ra), (tb, rb)| (ta, &ra.id).cmp(&(tb, &rb.id)));

    let clinician_review = ClinicianReview {
        reviewed: latest_review.is_some(),
        reviewed_at: latest_review.map(|(t, _)| format_instant(&t)),
        reviewed_by: Actor::from_ref(latest_review.and_then(|(_, r)| r.reviewed_by.as_ref())),
        notes: None,
    };

    AerBody {
        meta: Meta {
            report_type: ReportKind::Aer.as_str().to_string(),
            version: BODY_VERSION.to_string(),
            generated_at: period.generated_at(),
            period: PeriodOut {
                start: period.start_label(),
                end: period.end_label(),
            },
            clinic_id: selector.clinic_id.clone(),
            client_id: selector.client_id.clone(),
            program: selector.program.clone(),
            generated_by: GeneratedBy {
                kind: "system".to_string(),
                id: "aer-report".to_string(),
            },
        },
        context: Context {
            clinic: ClinicContext {
                name: snapshot.clinic.name.clone(),
            },
            client: ClientContext {
                display_id: snapshot.client.display_id.clone(),
            },
        },
        prescribed_interventions,
        adherence_timeline,
        noncompliance_escalations,
        clinician_review,
        audit_integrity: AuditIntegrity {
            data_sources,
            notes: AUDIT_NOTES.to_string(),
            report_id: selector.report_id(ReportKind::Aer),
            hash: None,
        },
        not_available: not_available.0,
    }
}

fn derive_intervention(
    assignment: &AssignmentRecord,
    period_responses: &[&ResponseRecord],
    period: &ReportPeriod,
) -> Intervention {
    let assigned_at = assignment.published_at.unwrap_or(assignment.created_at);

    let mut own: Vec<&ResponseRecord> = period_responses
        .iter()
        .copied()
        .filter(|r| r.assignment_id == assignment.id)
        .collect();
    own.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    let first = own.first();

    let latest_review = own
        .iter()
        .filter_map(|r| r.reviewed_at.map(|t| (t, *r)))
        .max_by(|(ta, ra), (tb, rb)| (ta, &ra.id).cmp(&(tb, &rb.id)));

    let completed = !own.is_empty();
    let late = match (first, assignment.due_date) {
        (Some(first), Some(due)) => first.created_at > due,
        _ => false,
    };
    let missed = !completed && assignment.due_date.is_some_and(|d| d <= period.last_instant());

    Intervention {
        assignment_id: assignment.id.clone(),
        title: assignment
            .title
            .clone()
            .or_else(|| assignment.prompt_title.clone()),
        library_source: assignment.library_source.as_ref().map(|src| LibrarySourceOut {
            item_id: src.item_id.clone(),
            version_id: src.version_id.clone(),
            version: src.version,
            title: src.title.clone(),
            slug: src.slug.clone(),
            content_type: src.content_type.clone(),
            status: "PUBLISHED".to_string(),
        }),
        assigned_by: Actor::from_ref(assignment.assigned_by.as_ref()),
        assigned_at: Some(format_instant(&assigned_at)),
        due: DueWindow {
            start: Some(format_instant(&assigned_at)),
            end: iso(assignment.due_date.as_ref()),
        },
        completion_criteria: None,
        completed_at: first.map(|r| format_instant(&r.created_at)),
        reviewed_at: latest_review.map(|(t, _)| format_instant(&t)),
        reviewed_by: Actor::from_ref(latest_review.and_then(|(_, r)| r.reviewed_by.as_ref())),
        evidence_refs: own.iter().map(|r| r.id.clone()).collect(),
        status_summary: StatusSummary {
            completed: u8::from(completed),
            partial: 0,
            missed: u8::from(missed),
            late: u8::from(late),
        },
    }
}
