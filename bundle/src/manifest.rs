//! Verification manifest: the plain-text record binding a report id to its
//! two digests.
//!
//! # Wire format
//!
//! ```text
//! REPORT_ID=<string>
//! GENERATED_AT=<ISO-8601 timestamp>
//! META_VERIFICATION=<optional string>
//! JSON_SHA256=<64 lowercase hex chars>
//! PDF_SHA256=<64 lowercase hex chars>
//! ```
//!
//! The writer always emits exactly these five lines, in this order, each
//! terminated by `\n`. `META_VERIFICATION` is written with an empty value
//! when absent. The reader is defensive: unknown lines and blank lines are
//! ignored, CRLF line endings are accepted, and trailing spaces or tabs on a
//! value are stripped. The digest key names are a compatibility contract.

use aer_kernel::proof::hash::{DigestParseError, Sha256Digest};

pub const REPORT_ID_KEY: &str = "REPORT_ID";
pub const GENERATED_AT_KEY: &str = "GENERATED_AT";
pub const META_VERIFICATION_KEY: &str = "META_VERIFICATION";
pub const JSON_SHA256_KEY: &str = "JSON_SHA256";
pub const PDF_SHA256_KEY: &str = "PDF_SHA256";

/// Manifest contents as written by the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub report_id: String,
    /// Informational only; never part of a verification verdict.
    pub generated_at: String,
    pub meta_verification: Option<String>,
    pub json_sha256: Sha256Digest,
    pub pdf_sha256: Sha256Digest,
}

/// Manifest contents as recovered by the reader.
///
/// Only the two digests are required; everything else may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedManifest {
    pub report_id: Option<String>,
    pub generated_at: Option<String>,
    pub meta_verification: Option<String>,
    pub json_sha256: Sha256Digest,
    pub pdf_sha256: Sha256Digest,
}

/// Error writing a manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestWriteError {
    /// A value contains a line break, which would forge extra lines.
    #[error("manifest {field} contains a line break")]
    LineBreakInValue { field: &'static str },
    /// The reader strips trailing spaces and tabs, so such a value would not
    /// read back as written.
    #[error("manifest {field} ends in whitespace")]
    TrailingWhitespace { field: &'static str },
}

/// Error reading a manifest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestParseError {
    #[error("manifest is not valid UTF-8 (at byte {valid_up_to})")]
    NotUtf8 { valid_up_to: usize },
    /// A required key is absent.
    #[error("manifest is missing required field {field}")]
    MissingField { field: &'static str },
    /// A known key appears more than once.
    #[error("manifest field {field} appears more than once (line {line})")]
    DuplicateField { field: &'static str, line: usize },
    /// A digest value is not 64 lowercase hex characters.
    #[error("manifest field {field} is not a valid digest: {source}")]
    InvalidDigest {
        field: &'static str,
        source: DigestParseError,
    },
}

fn check_value(field: &'static str, value: &str) -> Result<(), ManifestWriteError> {
    if value.contains(['\n', '\r']) {
        return Err(ManifestWriteError::LineBreakInValue { field });
    }
    if value.ends_with(char::is_whitespace) {
        return Err(ManifestWriteError::TrailingWhitespace { field });
    }
    Ok(())
}

impl Manifest {
    /// Serialize to the fixed five-line form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestWriteError::LineBreakInValue`] if a value contains
    /// `\n` or `\r`, or [`ManifestWriteError::TrailingWhitespace`] if one ends
    /// in whitespace. Values are written exactly as given.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestWriteError> {
        let meta = self.meta_verification.as_deref().unwrap_or("");
        check_value(REPORT_ID_KEY, &self.report_id)?;
        check_value(GENERATED_AT_KEY, &self.generated_at)?;
        check_value(META_VERIFICATION_KEY, meta)?;

        let json_hex = self.json_sha256.to_hex();
        let pdf_hex = self.pdf_sha256.to_hex();
        let lines: [(&str, &str); 5] = [
            (REPORT_ID_KEY, self.report_id.as_str()),
            (GENERATED_AT_KEY, self.generated_at.as_str()),
            (META_VERIFICATION_KEY, meta),
            (JSON_SHA256_KEY, &json_hex),
            (PDF_SHA256_KEY, &pdf_hex),
        ];
        let mut out = String::new();
        for (key, value) in lines {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

#[derive(Default)]
struct Slots<'a> {
    report_id: Option<&'a str>,
    generated_at: Option<&'a str>,
    meta_verification: Option<&'a str>,
    json_sha256: Option<&'a str>,
    pdf_sha256: Option<&'a str>,
}

fn fill<'a>(
    slot: &mut Option<&'a str>,
    field: &'static str,
    value: &'a str,
    line: usize,
) -> Result<(), ManifestParseError> {
    if slot.is_some() {
        return Err(ManifestParseError::DuplicateField { field, line });
    }
    *slot = Some(value);
    Ok(())
}

fn digest(field: &'static str, value: Option<&str>) -> Result<Sha256Digest, ManifestParseError> {
    let value = value.ok_or(ManifestParseError::MissingField { field })?;
    Sha256Digest::parse_hex(value).map_err(|source| ManifestParseError::InvalidDigest { field, source })
}

/// Parse manifest bytes.
///
/// # Errors
///
/// Returns [`ManifestParseError`] if the text is not UTF-8, a required digest
/// is missing or malformed, or a known key is duplicated.
pub fn parse_manifest(bytes: &[u8]) -> Result<ParsedManifest, ManifestParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ManifestParseError::NotUtf8 {
        valid_up_to: e.valid_up_to(),
    })?;

    let mut slots = Slots::default();
    for (index, raw) in text.split('\n').enumerate() {
        let line_no = index + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim_end_matches([' ', '\t']);
        match key {
            REPORT_ID_KEY => fill(&mut slots.report_id, REPORT_ID_KEY, value, line_no)?,
            GENERATED_AT_KEY => fill(&mut slots.generated_at, GENERATED_AT_KEY, value, line_no)?,
            META_VERIFICATION_KEY => fill(
                &mut slots.meta_verification,
                META_VERIFICATION_KEY,
                value,
                line_no,
            )?,
            JSON_SHA256_KEY => fill(&mut slots.json_sha256, JSON_SHA256_KEY, value, line_no)?,
            PDF_SHA256_KEY => fill(&mut slots.pdf_sha256, PDF_SHA256_KEY, value, line_no)?,
            _ => {}
        }
    }

    let json_sha256 = digest(JSON_SHA256_KEY, slots.json_sha256)?;
    let pdf_sha256 = digest(PDF_SHA256_KEY, slots.pdf_sha256)?;
    let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

    Ok(ParsedManifest {
        report_id: non_empty(slots.report_id),
        generated_at: non_empty(slots.generated_at),
        meta_verification: non_empty(slots.meta_verification),
        json_sha256,
        pdf_sha256,
    })
}
