//! AER Report: evidence snapshot to deterministic report artifacts.
//!
//! # API Surface
//!
//! - [`generator::ReportGenerator::generate`] -- snapshot to JSON bytes,
//!   document bytes, report id and both digests
//! - [`schema_v1::validate_declared`] -- validate untrusted report JSON against
//!   the contract version it declares
//!
//! # Module Dependency Direction
//!
//! `snapshot`, `period` ← `identity` ← `body` ← `schema_v1`, `render` ← `generator`

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod body;
pub mod generator;
pub mod identity;
pub mod period;
pub mod render;
pub mod schema_v1;
pub mod snapshot;

pub use generator::{GenerateError, GeneratedReport, GenerationConfig, ReportGenerator};
pub use identity::{ReportKind, ReportSelector};
pub use period::ReportPeriod;
pub use snapshot::EvidenceSnapshot;
