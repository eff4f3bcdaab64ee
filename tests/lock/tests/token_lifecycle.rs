//! External access tokens: issue, use, expire, revoke, and stay in scope.

use aer_access::token::SecretFingerprint;
use aer_access::{
    AccessDenied, Actor, DocumentFormat, FetchError, IssueError, IssueRequest, IssuedToken, ReportFetcher, Role,
    TokenScope, TokenStore, UseOutcome,
};
use aer_report::{ReportKind, ReportPeriod, ReportSelector};
use chrono::Duration;
use lock_tests::{clinic_admin, january_fetcher, january_selector};

fn issue(fetcher: &ReportFetcher, format: DocumentFormat, ttl_minutes: Option<u32>) -> IssuedToken {
    fetcher
        .access()
        .issue(
            &clinic_admin(),
            IssueRequest {
                selector: january_selector(),
                kind: ReportKind::Aer,
                format,
                ttl_minutes,
            },
        )
        .unwrap()
}

fn scope(client_id: &str, format: DocumentFormat) -> TokenScope {
    TokenScope {
        clinic_id: "C1".to_string(),
        client_id: client_id.to_string(),
        kind: ReportKind::Aer,
        format,
    }
}

fn issue_kind(fetcher: &ReportFetcher, kind: ReportKind, format: DocumentFormat) -> IssuedToken {
    fetcher
        .access()
        .issue(
            &clinic_admin(),
            IssueRequest {
                selector: january_selector(),
                kind,
                format,
                ttl_minutes: None,
            },
        )
        .unwrap()
}

#[test]
fn token_is_valid_until_exactly_its_expiry() {
    let (fetcher, clock) = january_fetcher();
    let issued = issue(&fetcher, DocumentFormat::Json, None);
    let secret = issued.secret.expose();
    let access = fetcher.access();

    assert!(access.authorize(secret, &scope("U1", DocumentFormat::Json)).is_ok());
    clock.advance(Duration::minutes(59));
    assert!(access.authorize(secret, &scope("U1", DocumentFormat::Json)).is_ok());
    clock.advance(Duration::minutes(1));
    assert!(access.authorize(secret, &scope("U1", DocumentFormat::Json)).is_err());
}

#[test]
fn revocation_is_immediate_and_idempotent() {
    let (fetcher, clock) = january_fetcher();
    let issued = issue(&fetcher, DocumentFormat::Pdf, Some(120));
    let secret = issued.secret.expose();
    fetcher.fetch_external(secret, "aer.pdf").unwrap();

    let first = fetcher.access().revoke(&clinic_admin(), issued.token.id).unwrap();
    assert!(matches!(fetcher.fetch_external(secret, "aer.pdf"), Err(FetchError::Denied(_))));

    clock.advance(Duration::minutes(10));
    let second = fetcher.access().revoke(&clinic_admin(), issued.token.id).unwrap();
    assert_eq!(first.revoked_at, second.revoked_at);
}

#[test]
fn scope_is_exact() {
    let (fetcher, _) = january_fetcher();
    let issued = issue(&fetcher, DocumentFormat::Json, None);
    let secret = issued.secret.expose();
    let access = fetcher.access();

    assert!(access.authorize(secret, &scope("U2", DocumentFormat::Json)).is_err());
    assert!(access.authorize(secret, &scope("U1", DocumentFormat::Pdf)).is_err());
    let other_clinic = TokenScope {
        clinic_id: "C2".to_string(),
        ..scope("U1", DocumentFormat::Json)
    };
    assert!(access.authorize(secret, &other_clinic).is_err());
    let other_kind = TokenScope {
        kind: ReportKind::AerRollup,
        ..scope("U1", DocumentFormat::Json)
    };
    assert!(access.authorize(secret, &other_kind).is_err());
    assert!(matches!(fetcher.fetch_external(secret, "aer.pdf"), Err(FetchError::Denied(_))));
    assert!(fetcher.fetch_external(secret, "aer.json").is_ok());
}

#[test]
fn rollup_token_cannot_fetch_an_aer_document() {
    let (fetcher, _) = january_fetcher();
    let rollup = issue_kind(&fetcher, ReportKind::AerRollup, DocumentFormat::Json);
    let secret = rollup.secret.expose();
    let rollup_scope = TokenScope {
        kind: ReportKind::AerRollup,
        ..scope("U1", DocumentFormat::Json)
    };

    assert!(fetcher.access().authorize(secret, &rollup_scope).is_ok());
    assert!(fetcher.access().authorize(secret, &scope("U1", DocumentFormat::Json)).is_err());
    assert!(matches!(fetcher.fetch_external(secret, "aer.json"), Err(FetchError::Denied(_))));

    let uses = fetcher.access().store().uses(rollup.token.id);
    assert_eq!(uses.len(), 1);
    assert_eq!(uses[0].outcome, UseOutcome::Denied);
}

#[test]
fn every_denial_reads_the_same() {
    let (fetcher, clock) = january_fetcher();
    let access = fetcher.access();
    let live = issue(&fetcher, DocumentFormat::Json, Some(5));
    let revoked = issue(&fetcher, DocumentFormat::Json, Some(5));
    access.revoke(&clinic_admin(), revoked.token.id).unwrap();

    let json = scope("U1", DocumentFormat::Json);
    let mut denials: Vec<AccessDenied> = vec![
        access.authorize("", &json).unwrap_err(),
        access.authorize("not-a-real-secret", &json).unwrap_err(),
        access.authorize(revoked.secret.expose(), &json).unwrap_err(),
        access.authorize(live.secret.expose(), &scope("U1", DocumentFormat::Pdf)).unwrap_err(),
    ];
    clock.advance(Duration::minutes(5));
    denials.push(access.authorize(live.secret.expose(), &json).unwrap_err());

    for denial in &denials {
        assert_eq!(denial.to_string(), "invalid or expired token");
    }
}

#[test]
fn only_the_fingerprint_is_stored() {
    let (fetcher, _) = january_fetcher();
    let issued = issue(&fetcher, DocumentFormat::Json, None);
    let secret = issued.secret.expose().to_string();
    let store = fetcher.access().store();

    let stored = store.lookup(issued.token.id).unwrap();
    assert_eq!(stored.fingerprint, SecretFingerprint::of(&secret));
    assert!(store.lookup_fingerprint(&SecretFingerprint::of(&secret)).is_some());
    assert!(!format!("{stored:?}").contains(&secret));
    assert!(!format!("{:?}", issued.secret).contains(&secret));
    assert_eq!(secret.len(), 64);
}

#[test]
fn ttl_bounds_are_enforced() {
    let (fetcher, _) = january_fetcher();
    let request = |ttl| IssueRequest {
        selector: january_selector(),
        kind: ReportKind::Aer,
        format: DocumentFormat::Json,
        ttl_minutes: Some(ttl),
    };
    let access = fetcher.access();
    assert!(matches!(
        access.issue(&clinic_admin(), request(0)),
        Err(IssueError::TtlOutOfRange { requested: 0, .. })
    ));
    assert!(matches!(
        access.issue(&clinic_admin(), request(10_081)),
        Err(IssueError::TtlOutOfRange { requested: 10_081, .. })
    ));
    let week = access.issue(&clinic_admin(), request(10_080)).unwrap();
    assert_eq!(week.token.expires_at - week.token.created_at, Duration::days(7));
}

#[test]
fn issuing_requires_clinic_administration() {
    let (fetcher, _) = january_fetcher();
    let request = || IssueRequest {
        selector: january_selector(),
        kind: ReportKind::Aer,
        format: DocumentFormat::Pdf,
        ttl_minutes: None,
    };
    let outsider = Actor::new("admin-c2", Role::ClinicAdmin, &["C2"]);
    let therapist = Actor::new("t-c1", Role::Therapist, &["C1"]);
    let platform = Actor::new("root", Role::Admin, &[]);
    assert!(matches!(fetcher.access().issue(&outsider, request()), Err(IssueError::Forbidden { .. })));
    assert!(matches!(fetcher.access().issue(&therapist, request()), Err(IssueError::Forbidden { .. })));
    assert!(fetcher.access().issue(&platform, request()).is_ok());
}

#[test]
fn token_for_another_period_cannot_reach_january() {
    let (fetcher, _) = january_fetcher();
    let february = ReportSelector::new("C1", "U1", ReportPeriod::parse("2026-02-01", "2026-02-28").unwrap(), None).unwrap();
    let issued = fetcher
        .access()
        .issue(
            &clinic_admin(),
            IssueRequest {
                selector: february,
                kind: ReportKind::Aer,
                format: DocumentFormat::Json,
                ttl_minutes: None,
            },
        )
        .unwrap();
    // Authorized, but the source holds no February snapshot.
    assert!(matches!(
        fetcher.fetch_external(issued.secret.expose(), "aer.json"),
        Err(FetchError::Source(_))
    ));
}
