//! Fetch surface: internal (authenticated, clinic-scoped) and external
//! (token-only) access to generated report documents.
//!
//! Both modes go through the same [`ReportGenerator`], so for one snapshot
//! they return the bytes that direct generation returns.

use std::collections::HashMap;
use std::sync::Arc;

use aer_bundle::{package, BundleError};
use aer_report::{EvidenceSnapshot, GenerateError, GeneratedReport, ReportGenerator, ReportKind, ReportSelector};

use crate::policy::Actor;
use crate::service::{AccessDenied, AccessService};
use crate::store::{TokenUse, UseOutcome};
use crate::token::DocumentFormat;

/// Error from an [`EvidenceSource`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("no evidence snapshot for {report_id}")]
    NotFound { report_id: String },
    #[error("evidence source unavailable: {detail}")]
    Unavailable { detail: String },
}

/// Supplies the already-assembled snapshot for one report selector.
pub trait EvidenceSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SourceError`] if no snapshot can be produced.
    fn snapshot(&self, selector: &ReportSelector) -> Result<EvidenceSnapshot, SourceError>;
}

/// Snapshots keyed by report id.
#[derive(Debug, Default)]
pub struct InMemoryEvidenceSource {
    snapshots: HashMap<String, EvidenceSnapshot>,
}

impl InMemoryEvidenceSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `snapshot` under its own selector.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the snapshot's identity or period is
    /// malformed.
    pub fn insert(&mut self, snapshot: EvidenceSnapshot) -> Result<(), GenerateError> {
        let selector = ReportGenerator::selector_of(&snapshot)?;
        self.snapshots.insert(selector.report_id(ReportKind::Aer), snapshot);
        Ok(())
    }
}

impl EvidenceSource for InMemoryEvidenceSource {
    fn snapshot(&self, selector: &ReportSelector) -> Result<EvidenceSnapshot, SourceError> {
        let report_id = selector.report_id(ReportKind::Aer);
        self.snapshots
            .get(&report_id)
            .cloned()
            .ok_or(SourceError::NotFound { report_id })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Denied(#[from] AccessDenied),
    #[error("user {user_id} may not export reports for clinic {clinic_id}")]
    Forbidden { user_id: String, clinic_id: String },
    #[error("unknown document name: {name}")]
    UnknownDocument { name: String },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// One served document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    pub report_id: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl FetchedDocument {
    fn from_report(report: GeneratedReport, format: DocumentFormat) -> Self {
        let bytes = match format {
            DocumentFormat::Json => report.json,
            DocumentFormat::Pdf => report.document,
        };
        Self {
            report_id: report.report_id,
            format,
            bytes,
        }
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Suggested download name, e.g. `AER_<report id>.pdf`.
    #[must_use]
    pub fn filename(&self) -> String {
        format!("AER_{}.{}", self.report_id, self.format)
    }
}

pub struct ReportFetcher {
    source: Arc<dyn EvidenceSource>,
    generator: ReportGenerator,
    access: AccessService,
}

impl std::fmt::Debug for ReportFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportFetcher")
            .field("generator", &self.generator)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl ReportFetcher {
    #[must_use]
    pub fn new(source: Arc<dyn EvidenceSource>, generator: ReportGenerator, access: AccessService) -> Self {
        Self {
            source,
            generator,
            access,
        }
    }

    #[must_use]
    pub fn access(&self) -> &AccessService {
        &self.access
    }

    fn generate(&self, selector: &ReportSelector) -> Result<GeneratedReport, FetchError> {
        let snapshot = self.source.snapshot(selector)?;
        Ok(self.generator.generate_selected(&snapshot, selector)?)
    }

    fn check_actor(actor: &Actor, selector: &ReportSelector) -> Result<(), FetchError> {
        if actor.can_administer(&selector.clinic_id) {
            Ok(())
        } else {
            Err(FetchError::Forbidden {
                user_id: actor.user_id.clone(),
                clinic_id: selector.clinic_id.clone(),
            })
        }
    }

    /// Internal mode: an authenticated actor selects the report directly.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Forbidden`] if the actor is not an administrator
    /// of the clinic, or a source or generation error.
    pub fn fetch_internal(
        &self,
        actor: &Actor,
        selector: &ReportSelector,
        format: DocumentFormat,
    ) -> Result<FetchedDocument, FetchError> {
        Self::check_actor(actor, selector)?;
        let report = self.generate(selector)?;
        tracing::debug!(report_id = %report.report_id, %format, user_id = %actor.user_id, "internal fetch");
        Ok(FetchedDocument::from_report(report, format))
    }

    /// Internal mode, returning the packaged three-entry bundle.
    ///
    /// # Errors
    ///
    /// As for [`ReportFetcher::fetch_internal`], plus packaging errors.
    pub fn fetch_internal_bundle(&self, actor: &Actor, selector: &ReportSelector) -> Result<Vec<u8>, FetchError> {
        Self::check_actor(actor, selector)?;
        let report = self.generate(selector)?;
        Ok(package(&report)?)
    }

    /// External mode: the caller presents only a token secret and a request
    /// name (`aer.json` or `aer.pdf`) that implies the format.
    ///
    /// Every presentation that matches a stored token is recorded in the
    /// store's use log.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnknownDocument`] for an unrecognized name,
    /// [`FetchError::Denied`] for any token failure, or a source or generation
    /// error.
    pub fn fetch_external(&self, presented: &str, request_name: &str) -> Result<FetchedDocument, FetchError> {
        let format = DocumentFormat::from_request_name(request_name).ok_or_else(|| FetchError::UnknownDocument {
            name: request_name.to_string(),
        })?;
        let token = match self.access.authorize_document(presented, ReportKind::Aer, format) {
            Ok(token) => token,
            Err(denied) => {
                if let Some(token_id) = denied.token_id {
                    self.record(token_id, request_name, UseOutcome::Denied);
                }
                return Err(denied.into());
            }
        };

        match self.generate(&token.selector) {
            Ok(report) => {
                self.record(token.id, request_name, UseOutcome::Served);
                tracing::debug!(token_id = %token.id, report_id = %report.report_id, %format, "external fetch");
                Ok(FetchedDocument::from_report(report, format))
            }
            Err(e) => {
                self.record(token.id, request_name, UseOutcome::Failed);
                Err(e)
            }
        }
    }

    fn record(&self, token_id: crate::token::TokenId, path: &str, outcome: UseOutcome) {
        self.access.store().record_use(TokenUse {
            token_id,
            at: self.access.clock().now(),
            path: path.to_string(),
            outcome,
        });
    }
}
