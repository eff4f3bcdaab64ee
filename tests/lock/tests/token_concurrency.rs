//! Fetches racing a revoke: each fetch settles on exactly one outcome, and
//! nothing started after the revoke returns is served.

use std::sync::atomic::{AtomicBool, Ordering};

use aer_access::{DocumentFormat, FetchError, IssueRequest, UseOutcome};
use aer_report::ReportKind;
use lock_tests::{clinic_admin, january_fetcher, january_report, january_selector};

const FETCH_THREADS: usize = 4;
const FETCHES_PER_THREAD: usize = 25;

#[test]
fn fetch_racing_revoke_settles_per_fetch() {
    let (fetcher, _) = january_fetcher();
    let issued = fetcher
        .access()
        .issue(
            &clinic_admin(),
            IssueRequest {
                selector: january_selector(),
                kind: ReportKind::Aer,
                format: DocumentFormat::Json,
                ttl_minutes: None,
            },
        )
        .unwrap();
    let secret = issued.secret.expose();
    let expected = january_report().json;
    let revoked = AtomicBool::new(false);

    let (fetcher_ref, revoked_ref, expected_ref) = (&fetcher, &revoked, &expected);
    std::thread::scope(|s| {
        let workers: Vec<_> = (0..FETCH_THREADS)
            .map(|_| {
                s.spawn(move || {
                    for _ in 0..FETCHES_PER_THREAD {
                        let started_after_revoke = revoked_ref.load(Ordering::SeqCst);
                        match fetcher_ref.fetch_external(secret, "aer.json") {
                            Ok(doc) => {
                                assert!(!started_after_revoke, "served after revoke returned");
                                assert_eq!(&doc.bytes, expected_ref);
                            }
                            Err(FetchError::Denied(_)) => {}
                            Err(other) => panic!("unexpected fetch error: {other}"),
                        }
                    }
                })
            })
            .collect();

        s.spawn(move || {
            std::thread::yield_now();
            fetcher_ref.access().revoke(&clinic_admin(), issued.token.id).unwrap();
            revoked_ref.store(true, Ordering::SeqCst);
        });

        for worker in workers {
            worker.join().unwrap();
        }
    });

    assert!(matches!(fetcher.fetch_external(secret, "aer.json"), Err(FetchError::Denied(_))));

    let uses = fetcher.access().store().uses(issued.token.id);
    assert_eq!(uses.len(), FETCH_THREADS * FETCHES_PER_THREAD + 1);
    assert!(uses
        .iter()
        .all(|u| matches!(u.outcome, UseOutcome::Served | UseOutcome::Denied)));
    assert_eq!(uses.last().map(|u| u.outcome), Some(UseOutcome::Denied));
}
