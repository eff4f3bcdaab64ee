//! Any single-bit change to a packaged payload is detected and attributed to
//! the artifact that changed.

use aer_bundle::archive::reader::parse_archive;
use aer_bundle::bundle::{DOCUMENT_ENTRY, JSON_ENTRY};
use aer_bundle::{verify_archive, FailureReason, Verdict};
use lock_tests::{flip_bit, january_bundle};
use proptest::prelude::*;

/// Byte range of `name`'s payload inside the archive.
fn payload_range(bundle: &[u8], name: &str) -> std::ops::Range<usize> {
    let entries = parse_archive(bundle).unwrap();
    let entry = entries.iter().find(|e| e.name == name).unwrap();
    let start = entry.local_header_offset as usize + 30 + entry.name.len();
    start..start + entry.data.len()
}

#[test]
fn untouched_bundle_passes() {
    let report = verify_archive(&january_bundle()).unwrap();
    assert_eq!(report.verdict(), Verdict::Pass);
    assert!(report.failures.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn json_bit_flip_fails_with_json_digest_mismatch(pos in any::<prop::sample::Index>(), bit in 0u8..8) {
        let bundle = january_bundle();
        let range = payload_range(&bundle, JSON_ENTRY);
        let tampered = flip_bit(&bundle, range.start + pos.index(range.len()), bit);

        let report = verify_archive(&tampered).unwrap();
        prop_assert_eq!(report.verdict(), Verdict::Fail);
        prop_assert!(report
            .failures
            .iter()
            .any(|f| matches!(f, FailureReason::JsonDigestMismatch { .. })),
            "expected JsonDigestMismatch in failures");
        prop_assert!(!report
            .failures
            .iter()
            .any(|f| matches!(f, FailureReason::DocumentDigestMismatch { .. })),
            "unexpected DocumentDigestMismatch in failures");
    }

    #[test]
    fn document_bit_flip_fails_with_document_digest_mismatch(pos in any::<prop::sample::Index>(), bit in 0u8..8) {
        let bundle = january_bundle();
        let range = payload_range(&bundle, DOCUMENT_ENTRY);
        let tampered = flip_bit(&bundle, range.start + pos.index(range.len()), bit);

        let report = verify_archive(&tampered).unwrap();
        prop_assert_eq!(report.verdict(), Verdict::Fail);
        prop_assert_eq!(report.failures.len(), 1);
        let is_document_mismatch = matches!(report.failures[0], FailureReason::DocumentDigestMismatch { .. });
        prop_assert!(is_document_mismatch);
    }
}
