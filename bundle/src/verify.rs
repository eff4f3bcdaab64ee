//! Offline verifier.
//!
//! Recomputes both digests, compares them with the manifest, and re-checks the
//! JSON body against its declared contract version. Nothing here trusts the
//! producer: every input is treated as opaque bytes. All failures are
//! collected so the caller sees every mismatching artifact at once.
//!
//! `GENERATED_AT` is reported but never affects the verdict.

use aer_kernel::proof::hash::{sha256, Sha256Digest};
use aer_kernel::schema::Violation;
use aer_report::schema_v1::validate_declared;

use crate::bundle::{extract_bundle, BundleError, BundleParts};
use crate::manifest::{parse_manifest, ManifestParseError, ParsedManifest};

/// One reason a bundle failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("JSON digest mismatch: manifest {expected}, computed {computed}")]
    JsonDigestMismatch {
        expected: Sha256Digest,
        computed: Sha256Digest,
    },
    #[error("document digest mismatch: manifest {expected}, computed {computed}")]
    DocumentDigestMismatch {
        expected: Sha256Digest,
        computed: Sha256Digest,
    },
    #[error("manifest missing required field {field}")]
    ManifestMissingField { field: &'static str },
    /// The manifest is present but unusable for another reason.
    #[error("manifest invalid: {0}")]
    ManifestInvalid(ManifestParseError),
    #[error("JSON payload does not parse: {detail}")]
    JsonNotParseable { detail: String },
    #[error("JSON payload violates its contract ({} violations)", .violations.len())]
    SchemaViolations { violations: Vec<Violation> },
    /// Manifest `REPORT_ID` disagrees with `audit_integrity.report_id`.
    #[error("report id mismatch: manifest {manifest}, body {body}")]
    ReportIdMismatch { manifest: String, body: String },
}

/// Binary outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full verification result: computed and expected digests plus every
/// failure found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub computed_json: Sha256Digest,
    pub computed_document: Sha256Digest,
    /// `None` when the manifest could not be parsed.
    pub expected_json: Option<Sha256Digest>,
    pub expected_document: Option<Sha256Digest>,
    pub report_id: Option<String>,
    pub generated_at: Option<String>,
    pub failures: Vec<FailureReason>,
}

impl VerifyReport {
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        if self.failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict() == Verdict::Pass
    }
}

fn manifest_failure(err: ManifestParseError) -> FailureReason {
    match err {
        ManifestParseError::MissingField { field } => FailureReason::ManifestMissingField { field },
        other => FailureReason::ManifestInvalid(other),
    }
}

/// Check the JSON payload: it must parse, satisfy its declared contract,
/// and carry the same report id as the manifest (when the manifest has one).
fn check_body(json: &[u8], manifest: Option<&ParsedManifest>, failures: &mut Vec<FailureReason>) {
    let value: serde_json::Value = match serde_json::from_slice(json) {
        Ok(v) => v,
        Err(e) => {
            failures.push(FailureReason::JsonNotParseable {
                detail: e.to_string(),
            });
            return;
        }
    };
    if let Err(violations) = validate_declared(&value) {
        failures.push(FailureReason::SchemaViolations { violations });
    }
    let body_id = value
        .pointer("/audit_integrity/report_id")
        .and_then(serde_json::Value::as_str);
    if let (Some(expected), Some(body)) = (manifest.and_then(|m| m.report_id.as_deref()), body_id) {
        if expected != body {
            failures.push(FailureReason::ReportIdMismatch {
                manifest: expected.to_string(),
                body: body.to_string(),
            });
        }
    }
}

/// Verify three discrete artifacts.
#[must_use]
pub fn verify_parts(parts: BundleParts<'_>) -> VerifyReport {
    let computed_json = sha256(parts.json);
    let computed_document = sha256(parts.document);

    let mut failures = Vec::new();
    let manifest = match parse_manifest(parts.manifest) {
        Ok(m) => Some(m),
        Err(e) => {
            failures.push(manifest_failure(e));
            None
        }
    };

    if let Some(m) = &manifest {
        if m.json_sha256 != computed_json {
            failures.push(FailureReason::JsonDigestMismatch {
                expected: m.json_sha256,
                computed: computed_json,
            });
        }
        if m.pdf_sha256 != computed_document {
            failures.push(FailureReason::DocumentDigestMismatch {
                expected: m.pdf_sha256,
                computed: computed_document,
            });
        }
    }

    check_body(parts.json, manifest.as_ref(), &mut failures);

    let report = VerifyReport {
        computed_json,
        computed_document,
        expected_json: manifest.as_ref().map(|m| m.json_sha256),
        expected_document: manifest.as_ref().map(|m| m.pdf_sha256),
        report_id: manifest.as_ref().and_then(|m| m.report_id.clone()),
        generated_at: manifest.and_then(|m| m.generated_at),
        failures,
    };
    tracing::info!(
        verdict = %report.verdict(),
        failures = report.failures.len(),
        report_id = report.report_id.as_deref().unwrap_or(""),
        "verified bundle"
    );
    report
}

/// Parse archive bytes and verify the three entries.
///
/// # Errors
///
/// Returns [`BundleError`] if the archive is structurally unusable. That is an
/// input error, not a verification verdict.
pub fn verify_archive(bytes: &[u8]) -> Result<VerifyReport, BundleError> {
    let parts = extract_bundle(bytes)?;
    Ok(verify_parts(parts))
}

/// Error from [`verify_idempotent_fetch`].
#[derive(Debug, thiserror::Error)]
pub enum IdempotencyError<E> {
    #[error("fetch {attempt} failed: {source}")]
    Fetch { attempt: u8, source: E },
    /// Two fetches of the same logical report returned different bytes.
    #[error("fetches differ: first {first}, second {second}")]
    Mismatch {
        first: Sha256Digest,
        second: Sha256Digest,
    },
}

/// Call `fetch` twice and require byte-identical payloads.
///
/// Returns the payload and its digest on success.
///
/// # Errors
///
/// Returns [`IdempotencyError::Fetch`] if either call fails, or
/// [`IdempotencyError::Mismatch`] if the digests differ.
pub fn verify_idempotent_fetch<F, E>(mut fetch: F) -> Result<(Vec<u8>, Sha256Digest), IdempotencyError<E>>
where
    F: FnMut() -> Result<Vec<u8>, E>,
    E: std::error::Error + 'static,
{
    let first = fetch().map_err(|source| IdempotencyError::Fetch { attempt: 1, source })?;
    let second = fetch().map_err(|source| IdempotencyError::Fetch { attempt: 2, source })?;
    let (a, b) = (sha256(&first), sha256(&second));
    if a != b {
        tracing::info!(%a, %b, "idempotency check failed");
        return Err(IdempotencyError::Mismatch { first: a, second: b });
    }
    Ok((first, a))
}
