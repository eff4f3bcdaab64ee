//! Generation is a pure function of the snapshot: repeated runs, reordered
//! input arrays, and a fresh process all yield the same bytes.

use aer_kernel::proof::canon::is_canonical;
use aer_kernel::proof::hash::sha256;
use aer_report::schema_v1::validate_declared;
use aer_report::ReportGenerator;
use lock_tests::{january_bundle, january_report, january_snapshot};

#[test]
fn repeated_generation_is_byte_identical() {
    let a = january_report();
    let b = january_report();
    assert_eq!(a.json, b.json);
    assert_eq!(a.document, b.document);
    assert_eq!(a.json_sha256, b.json_sha256);
    assert_eq!(a.document_sha256, b.document_sha256);
    assert_eq!(january_bundle(), january_bundle());
}

#[test]
fn input_order_does_not_change_output() {
    let mut shuffled = january_snapshot();
    shuffled.assignments.as_mut().unwrap().reverse();
    shuffled.responses.as_mut().unwrap().reverse();
    shuffled.checkins.as_mut().unwrap().reverse();
    shuffled.notifications.as_mut().unwrap().reverse();

    let reordered = ReportGenerator::default().generate(&shuffled).unwrap();
    let baseline = january_report();
    assert_eq!(reordered.json_sha256, baseline.json_sha256);
    assert_eq!(reordered.document_sha256, baseline.document_sha256);
}

#[test]
fn json_is_canonical_and_satisfies_declared_contract() {
    let report = january_report();
    assert!(is_canonical(&report.json));
    assert_eq!(report.json_sha256, sha256(&report.json));

    let value: serde_json::Value = serde_json::from_slice(&report.json).unwrap();
    validate_declared(&value).unwrap();
    assert_eq!(value["audit_integrity"]["report_id"], "AER-v1:C1:U1:2026-01-01:2026-01-31");
    assert_eq!(value["meta"]["generated_at"], "2026-01-31T23:59:59.999Z");
}

#[test]
fn out_of_period_evidence_is_excluded() {
    let value: serde_json::Value = serde_json::from_slice(&january_report().json).unwrap();
    let text = value.to_string();
    assert!(!text.contains("\"R0\""), "December response leaked into January report");
    assert!(text.contains("\"R1\""));
}

#[test]
fn only_reminders_become_escalations() {
    let value: serde_json::Value = serde_json::from_slice(&january_report().json).unwrap();
    let escalations = value["noncompliance_escalations"].as_array().unwrap();
    let assignments: Vec<&str> = escalations
        .iter()
        .map(|e| e["details"]["assignment_id"].as_str().unwrap())
        .collect();
    assert_eq!(assignments, ["A1", "A2"]);
    assert!(escalations.iter().all(|e| e["type"] == "reminder" && e["channel"] == "unknown"));
}

#[test]
fn program_filter_extends_report_id() {
    let mut snap = january_snapshot();
    snap.program = Some("core".to_string());
    let report = ReportGenerator::default().generate(&snap).unwrap();
    assert_eq!(report.report_id, "AER-v1:C1:U1:2026-01-01:2026-01-31:core");
    assert_ne!(report.json_sha256, january_report().json_sha256);
}

#[test]
fn document_is_a_pdf() {
    let report = january_report();
    assert!(report.document.starts_with(b"%PDF-"));
}
