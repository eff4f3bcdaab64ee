//! AER Bundle: manifest, stored-only archive, packager and offline verifier.
//!
//! # API Surface
//!
//! - [`bundle::package`] -- generated report to archive bytes
//! - [`bundle::extract_bundle`] -- archive bytes to the three named entries
//! - [`verify::verify_archive`] / [`verify::verify_parts`] -- PASS/FAIL with
//!   computed and expected digests
//! - [`bundle_dir`] -- the same three artifacts as discrete files
//!
//! The archive reader depends only on `archive`; it never sees the writer's
//! internal state.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod archive;
pub mod bundle;
pub mod bundle_dir;
pub mod manifest;
pub mod verify;

pub use bundle::{extract_bundle, package, BundleError, BundleParts};
pub use verify::{verify_archive, verify_parts, FailureReason, Verdict, VerifyReport};
