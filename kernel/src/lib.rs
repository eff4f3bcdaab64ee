//! AER Kernel: the deterministic core shared by every AER crate.
//!
//! # API Surface
//!
//! - [`proof::hash::sha256`] -- artifact digests (plain SHA-256, lowercase hex)
//! - [`proof::canon::canonical_json_bytes`] -- the one canonical JSON writer
//! - [`schema::validate`] -- structural validation of a decoded JSON value
//!
//! # Module Dependency Direction
//!
//! `proof` and `schema` are independent leaves. Higher crates (`aer-report`,
//! `aer-bundle`, `aer-access`) depend on the kernel; the kernel depends on
//! nothing internal.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod proof;
pub mod schema;
