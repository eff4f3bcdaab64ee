//! Report generator: evidence snapshot to `{JSON bytes, document bytes, id}`.
//!
//! Pipeline: validate period, derive body, canonicalize, re-parse and
//! validate against the contract (fail closed), render, digest. Every step is
//! a pure function of the snapshot, so generating twice yields equal digests.

use aer_kernel::proof::canon::{canonical_json_bytes_of, CanonError};
use aer_kernel::proof::hash::{sha256, Sha256Digest};
use aer_kernel::schema::Violation;
use serde::{Deserialize, Serialize};

use crate::body::{derive_body, AerBody};
use crate::identity::{IdentityError, ReportSelector};
use crate::period::{PeriodError, ReportPeriod};
use crate::render::{DocumentRenderer, RenderError, TextPdfRenderer};
use crate::schema_v1::{validate_body, SchemaVersion, UnknownSchemaVersion};
use crate::snapshot::EvidenceSnapshot;

/// Generation settings. `None` fields take the documented default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Contract version bodies are validated against. `None` uses `"v1"`.
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Marker for the manifest's `META_VERIFICATION` line. `None` leaves it empty.
    #[serde(default)]
    pub meta_verification: Option<String>,
}

/// Error generating a report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("snapshot period is invalid: {0}")]
    Period(#[from] PeriodError),
    #[error("snapshot identity is invalid: {0}")]
    Identity(#[from] IdentityError),
    #[error("canonical serialization failed: {0}")]
    Canon(#[from] CanonError),
    /// The canonical bytes did not parse back as JSON.
    #[error("canonical bytes failed to re-parse: {detail}")]
    Reparse { detail: String },
    /// The derived body does not satisfy the contract.
    #[error("report body violates the {version} contract ({} violations)", .violations.len())]
    Schema {
        version: &'static str,
        violations: Vec<Violation>,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The snapshot describes a different report than the one requested.
    #[error("snapshot is for {actual}, requested {expected}")]
    SelectorMismatch { expected: String, actual: String },
}

/// Output of one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReport {
    pub report_id: String,
    /// Informational timestamp for the manifest; equal to `meta.generated_at`.
    pub generated_at: String,
    pub meta_verification: Option<String>,
    pub body: AerBody,
    pub json: Vec<u8>,
    pub document: Vec<u8>,
    pub json_sha256: Sha256Digest,
    pub document_sha256: Sha256Digest,
}

pub struct ReportGenerator {
    renderer: Box<dyn DocumentRenderer>,
    version: SchemaVersion,
    meta_verification: Option<String>,
}

impl std::fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("version", &self.version)
            .field("meta_verification", &self.meta_verification)
            .finish_non_exhaustive()
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(Box::new(TextPdfRenderer))
    }
}

impl ReportGenerator {
    /// Generator with the default configuration and `renderer`.
    #[must_use]
    pub fn new(renderer: Box<dyn DocumentRenderer>) -> Self {
        Self {
            renderer,
            version: SchemaVersion::V1,
            meta_verification: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`UnknownSchemaVersion`] if the configured version is not known.
    pub fn from_config(
        config: &GenerationConfig,
        renderer: Box<dyn DocumentRenderer>,
    ) -> Result<Self, UnknownSchemaVersion> {
        let version = match &config.schema_version {
            Some(v) => SchemaVersion::parse(v)?,
            None => SchemaVersion::V1,
        };
        Ok(Self {
            renderer,
            version,
            meta_verification: config.meta_verification.clone(),
        })
    }

    /// Validate the snapshot's identity and period, returning its selector.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Period`] or [`GenerateError::Identity`].
    pub fn selector_of(snapshot: &EvidenceSnapshot) -> Result<ReportSelector, GenerateError> {
        let period = ReportPeriod::parse(&snapshot.period.start, &snapshot.period.end)?;
        Ok(ReportSelector::new(
            &snapshot.clinic.id,
            &snapshot.client.id,
            period,
            snapshot.program.as_deref(),
        )?)
    }

    /// Generate the report described by `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the snapshot is malformed, the body fails
    /// its contract, or rendering fails. Sparse evidence is not an error.
    pub fn generate(&self, snapshot: &EvidenceSnapshot) -> Result<GeneratedReport, GenerateError> {
        let selector = Self::selector_of(snapshot)?;
        self.generate_with(snapshot, &selector)
    }

    /// Generate, first checking that `snapshot` describes `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::SelectorMismatch`] if it does not, otherwise as
    /// for [`ReportGenerator::generate`].
    pub fn generate_selected(
        &self,
        snapshot: &EvidenceSnapshot,
        expected: &ReportSelector,
    ) -> Result<GeneratedReport, GenerateError> {
        let selector = Self::selector_of(snapshot)?;
        if &selector != expected {
            return Err(GenerateError::SelectorMismatch {
                expected: expected.report_id(crate::identity::ReportKind::Aer),
                actual: selector.report_id(crate::identity::ReportKind::Aer),
            });
        }
        self.generate_with(snapshot, &selector)
    }

    fn generate_with(
        &self,
        snapshot: &EvidenceSnapshot,
        selector: &ReportSelector,
    ) -> Result<GeneratedReport, GenerateError> {
        let body = derive_body(snapshot, selector);
        let report_id = body.audit_integrity.report_id.clone();
        tracing::debug!(%report_id, "derived report body");

        let json = canonical_json_bytes_of(&body)?;
        let value: serde_json::Value =
            serde_json::from_slice(&json).map_err(|e| GenerateError::Reparse {
                detail: e.to_string(),
            })?;
        if let Err(violations) = validate_body(&value, self.version) {
            tracing::debug!(%report_id, count = violations.len(), "report body failed contract");
            return Err(GenerateError::Schema {
                version: self.version.as_str(),
                violations,
            });
        }

        let document = self.renderer.render(&body)?;
        let json_sha256 = sha256(&json);
        let document_sha256 = sha256(&document);
        tracing::debug!(
            %report_id,
            json_bytes = json.len(),
            document_bytes = document.len(),
            %json_sha256,
            %document_sha256,
            "generated report"
        );

        Ok(GeneratedReport {
            report_id,
            generated_at: body.meta.generated_at.clone(),
            meta_verification: self.meta_verification.clone(),
            body,
            json,
            document,
            json_sha256,
            document_sha256,
        })
    }
}
