//! Internal and external fetch serve the same bytes, and repeated fetches are
//! idempotent.

use aer_access::{DocumentFormat, FetchError, IssueRequest};
use aer_bundle::bundle::build_manifest;
use aer_bundle::verify::{verify_idempotent_fetch, IdempotencyError};
use aer_bundle::{verify_parts, BundleParts};
use aer_kernel::proof::hash::sha256;
use aer_report::ReportKind;
use lock_tests::{clinic_admin, january_fetcher, january_report, january_selector};

#[test]
fn both_modes_serve_generated_bytes() {
    let (fetcher, _) = january_fetcher();
    let report = january_report();

    for format in [DocumentFormat::Json, DocumentFormat::Pdf] {
        let expected = match format {
            DocumentFormat::Json => &report.json,
            DocumentFormat::Pdf => &report.document,
        };
        let internal = fetcher
            .fetch_internal(&clinic_admin(), &january_selector(), format)
            .unwrap();
        let issued = fetcher
            .access()
            .issue(
                &clinic_admin(),
                IssueRequest {
                    selector: january_selector(),
                    kind: ReportKind::Aer,
                    format,
                    ttl_minutes: None,
                },
            )
            .unwrap();
        let external = fetcher
            .fetch_external(issued.secret.expose(), &format!("aer.{format}"))
            .unwrap();

        assert_eq!(&internal.bytes, expected);
        assert_eq!(&external.bytes, expected);
    }
}

#[test]
fn repeated_external_fetch_is_idempotent() {
    let (fetcher, _) = january_fetcher();
    let issued = fetcher
        .access()
        .issue(
            &clinic_admin(),
            IssueRequest {
                selector: january_selector(),
                kind: ReportKind::Aer,
                format: DocumentFormat::Pdf,
                ttl_minutes: None,
            },
        )
        .unwrap();
    let secret = issued.secret.expose();

    let (bytes, digest) =
        verify_idempotent_fetch(|| fetcher.fetch_external(secret, "aer.pdf").map(|d| d.bytes)).unwrap();
    assert_eq!(digest, sha256(&bytes));
    assert_eq!(digest, january_report().document_sha256);
}

#[test]
fn repeated_internal_fetch_is_idempotent() {
    let (fetcher, _) = january_fetcher();
    let (_, digest) = verify_idempotent_fetch(|| {
        fetcher
            .fetch_internal(&clinic_admin(), &january_selector(), DocumentFormat::Json)
            .map(|d| d.bytes)
    })
    .unwrap();
    assert_eq!(digest, january_report().json_sha256);
}

#[test]
fn fetch_failure_surfaces_with_attempt() {
    let (fetcher, _) = january_fetcher();
    let err = verify_idempotent_fetch(|| fetcher.fetch_external("bogus", "aer.json").map(|d| d.bytes)).unwrap_err();
    assert!(matches!(
        err,
        IdempotencyError::Fetch {
            attempt: 1,
            source: FetchError::Denied(_)
        }
    ));
}

#[test]
fn fetched_pair_verifies_against_manifest() {
    let (fetcher, _) = january_fetcher();
    let json = fetcher
        .fetch_internal(&clinic_admin(), &january_selector(), DocumentFormat::Json)
        .unwrap();
    let pdf = fetcher
        .fetch_internal(&clinic_admin(), &january_selector(), DocumentFormat::Pdf)
        .unwrap();
    let manifest = build_manifest(&january_report()).to_bytes().unwrap();

    let report = verify_parts(BundleParts {
        json: &json.bytes,
        document: &pdf.bytes,
        manifest: &manifest,
    });
    assert!(report.passed(), "{:?}", report.failures);
}

#[test]
fn internal_bundle_equals_direct_packaging() {
    let (fetcher, _) = january_fetcher();
    let served = fetcher.fetch_internal_bundle(&clinic_admin(), &january_selector()).unwrap();
    assert_eq!(served, lock_tests::january_bundle());
}
