//! AER Access: short-lived, revocable capability tokens and the fetch surface
//! they gate.
//!
//! # API Surface
//!
//! - [`service::AccessService`] -- issue, revoke, authorize
//! - [`store::TokenStore`] -- narrow storage seam; [`store::InMemoryTokenStore`]
//! - [`fetch::ReportFetcher`] -- internal and external fetch modes
//! - [`clock::Clock`] -- injected time

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod fetch;
pub mod policy;
pub mod service;
pub mod store;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fetch::{EvidenceSource, FetchError, FetchedDocument, InMemoryEvidenceSource, ReportFetcher};
pub use policy::{AccessPolicy, AccessPolicyConfig, Actor, Role};
pub use service::{AccessDenied, AccessService, IssueError, IssueRequest, RevokeError};
pub use store::{InMemoryTokenStore, TokenStore, TokenUse, UseOutcome};
pub use token::{AccessToken, DocumentFormat, IssuedToken, TokenId, TokenScope};
