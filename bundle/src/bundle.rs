//! Bundle packager: one generated report as a stored-only archive of exactly
//! three entries, `AER.json`, `AER.pdf`, `verification.txt`, in that order.

use aer_report::GeneratedReport;

use crate::archive::reader::{parse_archive, ArchiveError};
use crate::archive::writer::{write_stored_archive, ArchiveWriteError, EntrySpec};
use crate::archive::DosDateTime;
use crate::manifest::{Manifest, ManifestWriteError};

pub const JSON_ENTRY: &str = "AER.json";
pub const DOCUMENT_ENTRY: &str = "AER.pdf";
pub const MANIFEST_ENTRY: &str = "verification.txt";

/// Entry names in archive order.
pub const ENTRY_NAMES: [&str; 3] = [JSON_ENTRY, DOCUMENT_ENTRY, MANIFEST_ENTRY];

/// Error packaging or extracting a bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    #[error(transparent)]
    Manifest(#[from] ManifestWriteError),
    #[error(transparent)]
    Write(#[from] ArchiveWriteError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    /// A conventional entry is absent.
    #[error("bundle is missing entry {name}")]
    MissingEntry { name: &'static str },
    /// An entry other than the three conventional ones is present.
    #[error("bundle contains unexpected entry {name}")]
    ExtraEntry { name: String },
}

/// The three artifacts of one bundle, borrowed from wherever they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleParts<'a> {
    pub json: &'a [u8],
    pub document: &'a [u8],
    pub manifest: &'a [u8],
}

/// Build the manifest binding `report`'s identity to its digests.
#[must_use]
pub fn build_manifest(report: &GeneratedReport) -> Manifest {
    Manifest {
        report_id: report.report_id.clone(),
        generated_at: report.generated_at.clone(),
        meta_verification: report.meta_verification.clone(),
        json_sha256: report.json_sha256,
        pdf_sha256: report.document_sha256,
    }
}

/// Package `report` as archive bytes.
///
/// # Errors
///
/// Returns [`BundleError`] if the manifest cannot be written or the archive
/// would need ZIP64.
pub fn package(report: &GeneratedReport) -> Result<Vec<u8>, BundleError> {
    let manifest = build_manifest(report).to_bytes()?;
    let bytes = package_parts(
        BundleParts {
            json: &report.json,
            document: &report.document,
            manifest: &manifest,
        },
        DosDateTime::from_rfc3339(&report.generated_at),
    )?;
    tracing::debug!(report_id = %report.report_id, bytes = bytes.len(), "packaged bundle");
    Ok(bytes)
}

/// Package three pre-computed artifacts in the conventional order.
///
/// # Errors
///
/// Returns [`BundleError::Write`] if an entry is too large.
pub fn package_parts(parts: BundleParts<'_>, modified: DosDateTime) -> Result<Vec<u8>, BundleError> {
    Ok(write_stored_archive(
        &[
            EntrySpec {
                name: JSON_ENTRY,
                data: parts.json,
            },
            EntrySpec {
                name: DOCUMENT_ENTRY,
                data: parts.document,
            },
            EntrySpec {
                name: MANIFEST_ENTRY,
                data: parts.manifest,
            },
        ],
        modified,
    )?)
}

/// Parse archive bytes and pull out the three conventional entries.
///
/// Entry order within the archive is not enforced; the names are.
///
/// # Errors
///
/// Returns [`BundleError::Archive`] on structural failure,
/// [`BundleError::MissingEntry`] or [`BundleError::ExtraEntry`] otherwise.
pub fn extract_bundle(bytes: &[u8]) -> Result<BundleParts<'_>, BundleError> {
    let entries = parse_archive(bytes)?;
    if let Some(extra) = entries.iter().find(|e| !ENTRY_NAMES.contains(&e.name)) {
        return Err(BundleError::ExtraEntry {
            name: extra.name.to_string(),
        });
    }
    let find = |name: &'static str| {
        entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data)
            .ok_or(BundleError::MissingEntry { name })
    };
    Ok(BundleParts {
        json: find(JSON_ENTRY)?,
        document: find(DOCUMENT_ENTRY)?,
        manifest: find(MANIFEST_ENTRY)?,
    })
}
