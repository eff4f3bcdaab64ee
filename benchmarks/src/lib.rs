//! Shared helpers for AER benchmark suites.

use aer_report::snapshot::{
    AssignmentRecord, CheckinRecord, EvidenceSnapshot, FeedbackRecord, NotificationRecord, PersonRef, ResponseRecord,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn period_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).single().unwrap_or_default()
}

/// January snapshot with `assignments` assignments, each answered twice, plus
/// one check-in and one due-date reminder per assignment.
#[must_use]
pub fn scaled_snapshot(assignments: usize) -> EvidenceSnapshot {
    let start = period_start();
    let at = |minutes: usize| start + Duration::minutes(i64::try_from(minutes).unwrap_or(i64::MAX / 2));
    let therapist = PersonRef {
        user_id: "T1".to_string(),
        name: Some("Therapist One".to_string()),
    };
    // Spread events over the first 28 days.
    let step = (28 * 24 * 60) / assignments.max(1);

    let mut snap = EvidenceSnapshot::bare("C1", "U1", "2026-01-01", "2026-01-31");
    let mut assignment_list = Vec::with_capacity(assignments);
    let mut responses = Vec::with_capacity(assignments * 2);
    let mut feedback = Vec::with_capacity(assignments);
    let mut checkins = Vec::with_capacity(assignments);
    let mut notifications = Vec::with_capacity(assignments);

    for i in 0..assignments {
        let id = format!("A{i:05}");
        let created = at(i * step);
        assignment_list.push(AssignmentRecord {
            id: id.clone(),
            title: Some(format!("Exercise {i}")),
            prompt_title: None,
            created_at: created,
            published_at: Some(created),
            due_date: Some(created + Duration::days(2)),
            library_source: None,
            assigned_by: Some(therapist.clone()),
        });
        for r in 0..2 {
            responses.push(ResponseRecord {
                id: format!("R{i:05}-{r}"),
                assignment_id: id.clone(),
                created_at: created + Duration::hours(3 + r),
                mood: i64::try_from(i % 5).unwrap_or(0) + 1,
                reviewed_at: None,
                reviewed_by: None,
                flagged_at: None,
                starred_at: None,
            });
        }
        feedback.push(FeedbackRecord {
            response_id: format!("R{i:05}-0"),
            assignment_id: id.clone(),
            created_at: created + Duration::hours(6),
            therapist: Some(therapist.clone()),
        });
        checkins.push(CheckinRecord {
            id: format!("K{i:05}"),
            created_at: created + Duration::minutes(30),
            mood: 3,
        });
        notifications.push(NotificationRecord {
            kind: "assignment_due_24h".to_string(),
            dedupe_key: Some(format!("assignment:{id}:due_24h")),
            created_at: created + Duration::days(1),
        });
    }

    snap.assignments = Some(assignment_list);
    snap.responses = Some(responses);
    snap.feedback = Some(feedback);
    snap.checkins = Some(checkins);
    snap.notifications = Some(notifications);
    snap
}
