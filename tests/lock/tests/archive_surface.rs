//! The packaged archive is a plain stored ZIP with exactly three entries in a
//! fixed order, and the reader refuses anything it cannot check.

use aer_bundle::archive::reader::{parse_archive, ArchiveError};
use aer_bundle::bundle::{ENTRY_NAMES, MANIFEST_ENTRY};
use aer_bundle::manifest::parse_manifest;
use aer_bundle::{extract_bundle, verify_archive, BundleError};
use lock_tests::{january_bundle, january_report};

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

#[test]
fn entries_are_ordered_and_stored() {
    let bundle = january_bundle();
    let entries = parse_archive(&bundle).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name).collect();
    assert_eq!(names, ENTRY_NAMES);

    // Local header of the first entry starts the file; method field is 0.
    assert_eq!(&bundle[..4], b"PK\x03\x04");
    assert_eq!(u16::from_le_bytes([bundle[8], bundle[9]]), 0);
}

#[test]
fn extracted_entries_equal_generated_artifacts() {
    let report = january_report();
    let bundle = aer_bundle::package(&report).unwrap();
    let parts = extract_bundle(&bundle).unwrap();
    assert_eq!(parts.json, report.json.as_slice());
    assert_eq!(parts.document, report.document.as_slice());

    let manifest = parse_manifest(parts.manifest).unwrap();
    assert_eq!(manifest.report_id.as_deref(), Some(report.report_id.as_str()));
    assert_eq!(manifest.json_sha256, report.json_sha256);
    assert_eq!(manifest.pdf_sha256, report.document_sha256);
    assert_eq!(manifest.generated_at.as_deref(), Some("2026-01-31T23:59:59.999Z"));
}

#[test]
fn compressed_entry_is_rejected() {
    let mut bundle = january_bundle();
    let eocd = bundle.len() - 22;
    let cd_start = u32_at(&bundle, eocd + 16) as usize;
    // Method 8 (deflate) in both the central record and the local header.
    bundle[cd_start + 10] = 8;
    bundle[8] = 8;

    let err = verify_archive(&bundle).unwrap_err();
    assert!(matches!(
        err,
        BundleError::Archive(ArchiveError::UnsupportedCompression { method: 8, .. })
    ));
}

#[test]
fn truncated_archive_is_rejected() {
    let bundle = january_bundle();
    assert!(matches!(
        parse_archive(&bundle[..bundle.len() - 10]),
        Err(ArchiveError::EocdNotFound)
    ));
    assert!(verify_archive(&bundle[..100]).is_err());
}

#[test]
fn manifest_reports_the_verified_id() {
    let bundle = january_bundle();
    let report = verify_archive(&bundle).unwrap();
    assert_eq!(report.report_id.as_deref(), Some("AER-v1:C1:U1:2026-01-01:2026-01-31"));
    let parts = extract_bundle(&bundle).unwrap();
    let text = std::str::from_utf8(parts.manifest).unwrap();
    assert!(text.starts_with("REPORT_ID="), "{MANIFEST_ENTRY} starts with REPORT_ID");
}
