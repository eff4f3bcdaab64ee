//! Bundle directory persistence: the three artifacts as discrete files.
//!
//! # Directory layout
//!
//! ```text
//! <dir>/
//!   AER.json          canonical JSON body
//!   AER.pdf           rendered document
//!   verification.txt  manifest
//! ```
//!
//! The directory path is never part of any digest.
//!
//! # Fail-closed semantics
//!
//! - Missing artifact file: error
//! - Extra file: error
//! - Digest or contract mismatch: reported by [`verify_bundle_dir`] as a
//!   failed [`VerifyReport`]

use std::collections::BTreeSet;
use std::path::Path;

use crate::bundle::{BundleParts, ENTRY_NAMES, DOCUMENT_ENTRY, JSON_ENTRY, MANIFEST_ENTRY};
use crate::verify::{verify_parts, VerifyReport};

/// Prefix of in-flight files left by [`write_bundle_dir`].
const TEMP_PREFIX: &str = ".tmp_";

/// Error writing a bundle directory.
#[derive(Debug, thiserror::Error)]
pub enum BundleDirWriteError {
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

/// Error reading a bundle directory.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BundleDirReadError {
    #[error("I/O error: {detail}")]
    Io { detail: String },
    #[error("missing artifact file: {filename}")]
    MissingArtifact { filename: &'static str },
    #[error("unexpected extra file: {name}")]
    ExtraFile { name: String },
}

/// Owned copy of the three artifacts read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFiles {
    pub json: Vec<u8>,
    pub document: Vec<u8>,
    pub manifest: Vec<u8>,
}

impl BundleFiles {
    #[must_use]
    pub fn parts(&self) -> BundleParts<'_> {
        BundleParts {
            json: &self.json,
            document: &self.document,
            manifest: &self.manifest,
        }
    }
}

/// Write the three artifacts into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns [`BundleDirWriteError`] on I/O failure.
pub fn write_bundle_dir(parts: BundleParts<'_>, dir: &Path) -> Result<(), BundleDirWriteError> {
    std::fs::create_dir_all(dir).map_err(|e| BundleDirWriteError::Io {
        detail: format!("create_dir_all: {e}"),
    })?;
    write_atomic(&dir.join(JSON_ENTRY), parts.json)?;
    write_atomic(&dir.join(DOCUMENT_ENTRY), parts.document)?;
    write_atomic(&dir.join(MANIFEST_ENTRY), parts.manifest)?;
    tracing::debug!(dir = %dir.display(), "wrote bundle directory");
    Ok(())
}

/// Read the three artifacts from `dir`.
///
/// # Errors
///
/// Returns [`BundleDirReadError`] if a file is missing, an unexpected file is
/// present, or the directory cannot be listed.
pub fn read_bundle_dir(dir: &Path) -> Result<BundleFiles, BundleDirReadError> {
    let files = BundleFiles {
        json: read_required(dir, JSON_ENTRY)?,
        document: read_required(dir, DOCUMENT_ENTRY)?,
        manifest: read_required(dir, MANIFEST_ENTRY)?,
    };
    for name in list_files(dir)? {
        if !ENTRY_NAMES.contains(&name.as_str()) {
            return Err(BundleDirReadError::ExtraFile { name });
        }
    }
    Ok(files)
}

/// Read `dir` and verify its contents offline.
///
/// # Errors
///
/// Returns [`BundleDirReadError`] if the directory itself is unusable.
/// Integrity failures come back inside the [`VerifyReport`].
pub fn verify_bundle_dir(dir: &Path) -> Result<VerifyReport, BundleDirReadError> {
    let files = read_bundle_dir(dir)?;
    Ok(verify_parts(files.parts()))
}

/// Write via temp file + rename.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), BundleDirWriteError> {
    let dir = path.parent().ok_or_else(|| BundleDirWriteError::Io {
        detail: "no parent directory".into(),
    })?;
    let temp_name = format!(
        "{TEMP_PREFIX}{}",
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    let temp_path = dir.join(temp_name);

    std::fs::write(&temp_path, content).map_err(|e| BundleDirWriteError::Io {
        detail: format!("write {}: {e}", temp_path.display()),
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| BundleDirWriteError::Io {
        detail: format!("rename {} to {}: {e}", temp_path.display(), path.display()),
    })?;
    Ok(())
}

fn read_required(dir: &Path, filename: &'static str) -> Result<Vec<u8>, BundleDirReadError> {
    match std::fs::read(dir.join(filename)) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(BundleDirReadError::MissingArtifact { filename })
        }
        Err(e) => Err(BundleDirReadError::Io {
            detail: format!("read {filename}: {e}"),
        }),
    }
}

/// Regular files in `dir`, skipping in-flight temp files.
fn list_files(dir: &Path) -> Result<BTreeSet<String>, BundleDirReadError> {
    let io = |what: &str, e: std::io::Error| BundleDirReadError::Io {
        detail: format!("{what}: {e}"),
    };
    let mut files = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io("read_dir", e))? {
        let entry = entry.map_err(|e| io("dir entry", e))?;
        let file_type = entry.file_type().map_err(|e| io("file_type", e))?;
        if !file_type.is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) if name.starts_with(TEMP_PREFIX) => {}
            Some(name) => {
                files.insert(name.to_string());
            }
            None => {
                return Err(BundleDirReadError::ExtraFile {
                    name: entry.file_name().to_string_lossy().into_owned(),
                })
            }
        }
    }
    Ok(files)
}
