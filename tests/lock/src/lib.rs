//! Shared fixtures for the lock tests.
//!
//! Every helper here is deterministic: the January snapshot is a checked-in
//! file, the clock is manual, and no helper reads process state.

#![forbid(unsafe_code)]

use std::sync::Arc;

use aer_access::{
    AccessPolicy, AccessService, Actor, InMemoryEvidenceSource, InMemoryTokenStore, ManualClock, ReportFetcher, Role,
};
use aer_report::{EvidenceSnapshot, GeneratedReport, ReportGenerator, ReportPeriod, ReportSelector};
use chrono::{DateTime, TimeZone, Utc};

/// Snapshot covering every evidence category for client `U1` of clinic `C1`.
pub const JANUARY_SNAPSHOT: &[u8] = include_bytes!("../fixtures/c1_u1_january.json");

/// # Panics
///
/// Panics if the checked-in fixture no longer parses.
#[must_use]
pub fn january_snapshot() -> EvidenceSnapshot {
    EvidenceSnapshot::from_json_slice(JANUARY_SNAPSHOT).expect("fixture snapshot parses")
}

/// # Panics
///
/// Panics if the fixture period is invalid.
#[must_use]
pub fn january_selector() -> ReportSelector {
    let period = ReportPeriod::parse("2026-01-01", "2026-01-31").expect("fixture period");
    ReportSelector::new("C1", "U1", period, None).expect("fixture selector")
}

/// # Panics
///
/// Panics if generation fails.
#[must_use]
pub fn january_report() -> GeneratedReport {
    ReportGenerator::default()
        .generate(&january_snapshot())
        .expect("fixture report generates")
}

/// # Panics
///
/// Panics if generation or packaging fails.
#[must_use]
pub fn january_bundle() -> Vec<u8> {
    aer_bundle::package(&january_report()).expect("fixture report packages")
}

/// Instant the fetch fixtures start at: the morning after the fixture period.
///
/// # Panics
///
/// Never in practice; the literal is a valid instant.
#[must_use]
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).single().expect("valid instant")
}

/// Fetcher serving only the January snapshot, on a manual clock.
///
/// # Panics
///
/// Panics if the fixture cannot be indexed.
#[must_use]
pub fn january_fetcher() -> (ReportFetcher, Arc<ManualClock>) {
    let mut source = InMemoryEvidenceSource::new();
    source.insert(january_snapshot()).expect("fixture indexes");
    let clock = Arc::new(ManualClock::new(fixture_now()));
    let access = AccessService::new(Arc::new(InMemoryTokenStore::new()), clock.clone(), AccessPolicy::default());
    (ReportFetcher::new(Arc::new(source), ReportGenerator::default(), access), clock)
}

#[must_use]
pub fn clinic_admin() -> Actor {
    Actor::new("admin-c1", Role::ClinicAdmin, &["C1"])
}

/// Flip one bit of `bytes[index]`.
#[must_use]
pub fn flip_bit(bytes: &[u8], index: usize, bit: u8) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out[index] ^= 1 << (bit % 8);
    out
}
