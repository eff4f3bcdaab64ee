//! Hash engine: SHA-256 over raw bytes, rendered as lowercase hex.
//!
//! **Exactly one place computes artifact digests.** The manifest's
//! `JSON_SHA256` / `PDF_SHA256` fields, the verifier, and the idempotency
//! check all route through [`sha256`]. Digests are plain SHA-256 over the
//! artifact bytes (no domain prefix) so that a third party can reproduce them
//! with any stock `sha256sum`.
//!
//! Domain-separated hashing (secrets, fingerprints) uses [`sha256_with_domain`],
//! which never produces an artifact digest.

use sha2::{Digest, Sha256};

/// Length of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a SHA-256 digest rendered as hex.
pub const DIGEST_HEX_LEN: usize = DIGEST_LEN * 2;

/// A 32-byte SHA-256 digest.
///
/// Invariant: [`Sha256Digest::to_hex`] always yields exactly 64 lowercase hex
/// characters, and [`Sha256Digest::parse_hex`] accepts only that form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha256Digest([u8; DIGEST_LEN]);

/// Error parsing a hex digest string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestParseError {
    /// Input is not exactly 64 characters long.
    #[error("digest must be 64 hex chars, got {len}")]
    BadLength { len: usize },
    /// Input contains a character outside `[0-9a-f]`.
    #[error("digest contains non-lowercase-hex character at index {index}")]
    NotLowercaseHex { index: usize },
}

impl Sha256Digest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering (64 chars).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-char lowercase hex string. Uppercase hex is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] if the length or alphabet is wrong.
    pub fn parse_hex(s: &str) -> Result<Self, DigestParseError> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestParseError::BadLength { len: s.len() });
        }
        if let Some(index) = s
            .bytes()
            .position(|b| !matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(DigestParseError::NotLowercaseHex { index });
        }
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut out)
            .map_err(|_| DigestParseError::NotLowercaseHex { index: 0 })?;
        Ok(Self(out))
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// SHA-256 of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> Sha256Digest {
    let result = Sha256::digest(data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&result);
    Sha256Digest(out)
}

/// SHA-256 of `data`, as lowercase hex.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    sha256(data).to_hex()
}

/// SHA-256 of `domain || data`.
///
/// `domain` must be a null-terminated ASCII tag so that no domain is a prefix
/// of another.
#[must_use]
pub fn sha256_with_domain(domain: &[u8], data: &[u8]) -> Sha256Digest {
    debug_assert!(domain.ends_with(&[0]), "domain tag must be null-terminated");
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&result);
    Sha256Digest(out)
}
