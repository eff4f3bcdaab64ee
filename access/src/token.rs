//! External access token records.
//!
//! A token is a capability: whoever presents the secret may fetch exactly one
//! document format of exactly one logical report until the token expires or is
//! revoked. The store keeps only a fingerprint of the secret.

use aer_kernel::proof::hash::{sha256_with_domain, Sha256Digest};
use aer_report::{ReportKind, ReportSelector};
use chrono::{DateTime, Utc};
use rand::{CryptoRng, RngCore};
use uuid::Uuid;

/// Domain prefix for secret fingerprints.
pub const DOMAIN_TOKEN_FINGERPRINT: &[u8] = b"AER::EXTERNAL_ACCESS_TOKEN::V1\0";

/// Random bytes in a token secret before hex encoding.
pub const SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(Uuid);

impl TokenId {
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// # Errors
    ///
    /// Returns the `uuid` parse error for anything that is not a UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// The raw capability secret. Shown to the issuer once; never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);

impl TokenSecret {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        rng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn fingerprint(&self) -> SecretFingerprint {
        SecretFingerprint::of(&self.0)
    }
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenSecret(..)")
    }
}

/// Domain-separated digest of a presented secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecretFingerprint(Sha256Digest);

impl SecretFingerprint {
    #[must_use]
    pub fn of(secret: &str) -> Self {
        Self(sha256_with_domain(DOMAIN_TOKEN_FINGERPRINT, secret.as_bytes()))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

/// Document format a token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Json,
    Pdf,
}

impl DocumentFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Pdf => "application/pdf",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Format implied by an external request name such as `aer.pdf`.
    #[must_use]
    pub fn from_request_name(name: &str) -> Option<Self> {
        let (stem, ext) = name.rsplit_once('.')?;
        if !stem.eq_ignore_ascii_case("aer") {
            return None;
        }
        Self::parse(ext)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a token grants. All four components must match a request exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenScope {
    pub clinic_id: String,
    pub client_id: String,
    pub kind: ReportKind,
    pub format: DocumentFormat,
}

/// Lifecycle state at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
    Revoked,
}

/// Stored token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub id: TokenId,
    pub fingerprint: SecretFingerprint,
    /// The one report this token selects, including period and program.
    pub selector: ReportSelector,
    pub kind: ReportKind,
    pub format: DocumentFormat,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    #[must_use]
    pub fn scope(&self) -> TokenScope {
        TokenScope {
            clinic_id: self.selector.clinic_id.clone(),
            client_id: self.selector.client_id.clone(),
            kind: self.kind,
            format: self.format,
        }
    }

    /// Revocation wins over expiry; expiry is reached at `expires_at`.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked_at.is_some() {
            TokenState::Revoked
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    #[must_use]
    pub fn report_id(&self) -> String {
        self.selector.report_id(self.kind)
    }
}

/// A freshly issued token together with its one-time secret.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: AccessToken,
    pub secret: TokenSecret,
}

impl IssuedToken {
    /// Relative URL a recipient uses to fetch the document.
    #[must_use]
    pub fn fetch_path(&self) -> String {
        format!(
            "/api/v1/external/aer.{}?token={}",
            self.token.format,
            self.secret.expose()
        )
    }
}
