//! Clinic C1, client U1, January 2026: generate, package, verify; then
//! tamper and watch the verifier name what changed.

use aer_access::DocumentFormat;
use aer_bundle::archive::DosDateTime;
use aer_bundle::bundle::{extract_bundle, package_parts, BundleParts, DOCUMENT_ENTRY};
use aer_bundle::bundle_dir::{verify_bundle_dir, write_bundle_dir, BundleDirReadError};
use aer_bundle::{verify_archive, verify_parts, FailureReason, Verdict};
use aer_report::ReportGenerator;
use lock_tests::{clinic_admin, january_bundle, january_fetcher, january_report, january_selector, january_snapshot};

#[test]
fn generated_bundle_passes_offline() {
    let (fetcher, _) = january_fetcher();
    let bundle = fetcher.fetch_internal_bundle(&clinic_admin(), &january_selector()).unwrap();

    let report = verify_archive(&bundle).unwrap();
    assert_eq!(report.verdict(), Verdict::Pass);
    let expected = january_report();
    assert_eq!(report.computed_json, expected.json_sha256);
    assert_eq!(report.computed_document, expected.document_sha256);
    assert_eq!(report.expected_json, Some(expected.json_sha256));
    assert_eq!(report.expected_document, Some(expected.document_sha256));
    assert_eq!(report.generated_at.as_deref(), Some("2026-01-31T23:59:59.999Z"));
}

#[test]
fn padded_program_bundle_verifies_against_itself() {
    let mut snapshot = january_snapshot();
    snapshot.program = Some("CBT ".into());
    let report = ReportGenerator::default().generate(&snapshot).unwrap();
    assert_eq!(report.report_id, "AER-v1:C1:U1:2026-01-01:2026-01-31:CBT");

    let verdict = verify_archive(&aer_bundle::package(&report).unwrap()).unwrap();
    assert!(verdict.passed(), "{:?}", verdict.failures);

    snapshot.program = Some("   ".into());
    let blank = ReportGenerator::default().generate(&snapshot).unwrap();
    assert_eq!(blank.report_id, january_report().report_id);
}

#[test]
fn replaced_document_fails_naming_the_document() {
    let bundle = january_bundle();
    let parts = extract_bundle(&bundle).unwrap();
    let mut document = parts.document.to_vec();
    document.extend_from_slice(b"\n% appended\n");
    let tampered = package_parts(
        BundleParts {
            json: parts.json,
            document: &document,
            manifest: parts.manifest,
        },
        DosDateTime::from_rfc3339("2026-01-31T23:59:59.999Z"),
    )
    .unwrap();

    let report = verify_archive(&tampered).unwrap();
    assert_eq!(report.verdict(), Verdict::Fail);
    assert_eq!(report.failures.len(), 1);
    let message = report.failures[0].to_string();
    assert!(message.starts_with("document digest mismatch"), "{message}");
    assert_eq!(report.computed_json, january_report().json_sha256);
}

#[test]
fn manifest_naming_another_report_fails() {
    let report = january_report();
    let bundle = aer_bundle::package(&report).unwrap();
    let parts = extract_bundle(&bundle).unwrap();
    let manifest = String::from_utf8(parts.manifest.to_vec())
        .unwrap()
        .replace(":U1:", ":U2:");

    let verdict = verify_parts(BundleParts {
        json: parts.json,
        document: parts.document,
        manifest: manifest.as_bytes(),
    });
    assert!(!verdict.passed());
    assert!(matches!(
        verdict.failures.as_slice(),
        [FailureReason::ReportIdMismatch { .. }]
    ));
}

#[test]
fn directory_form_round_trips_and_detects_tamper() {
    let dir = tempfile::tempdir().unwrap();
    let bundle = january_bundle();
    write_bundle_dir(extract_bundle(&bundle).unwrap(), dir.path()).unwrap();
    assert!(verify_bundle_dir(dir.path()).unwrap().passed());

    let pdf_path = dir.path().join(DOCUMENT_ENTRY);
    let mut pdf = std::fs::read(&pdf_path).unwrap();
    let last = pdf.len() - 1;
    pdf[last] ^= 0x01;
    std::fs::write(&pdf_path, &pdf).unwrap();

    let report = verify_bundle_dir(dir.path()).unwrap();
    assert!(matches!(
        report.failures.as_slice(),
        [FailureReason::DocumentDigestMismatch { .. }]
    ));
}

#[test]
fn directory_with_stray_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(extract_bundle(&january_bundle()).unwrap(), dir.path()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    assert!(matches!(
        verify_bundle_dir(dir.path()),
        Err(BundleDirReadError::ExtraFile { .. })
    ));
}

#[test]
fn served_json_and_pdf_match_bundle_entries() {
    let (fetcher, _) = january_fetcher();
    let bundle = january_bundle();
    let parts = extract_bundle(&bundle).unwrap();
    let json = fetcher
        .fetch_internal(&clinic_admin(), &january_selector(), DocumentFormat::Json)
        .unwrap();
    let pdf = fetcher
        .fetch_internal(&clinic_admin(), &january_selector(), DocumentFormat::Pdf)
        .unwrap();
    assert_eq!(json.bytes, parts.json);
    assert_eq!(pdf.bytes, parts.document);
}
