//! Token store interface and the in-memory implementation.
//!
//! The store is the only shared mutable state in the subsystem. Each method
//! is atomic with respect to a single token: a fetch that looks a token up and
//! a concurrent revoke are ordered by the store lock, so the fetch sees either
//! the active record or the revoked one, never a mix.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::token::{AccessToken, SecretFingerprint, TokenId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenStoreError {
    #[error("token {id} already exists")]
    DuplicateId { id: TokenId },
    /// Two tokens would share a secret.
    #[error("token secret fingerprint already registered")]
    DuplicateFingerprint,
    #[error("token {id} not found")]
    NotFound { id: TokenId },
}

/// Outcome of one presentation of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseOutcome {
    Served,
    Denied,
    /// Authorized, but generating the document failed.
    Failed,
}

/// Audit record of one token presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUse {
    pub token_id: TokenId,
    pub at: DateTime<Utc>,
    pub path: String,
    pub outcome: UseOutcome,
}

/// Narrow store interface: issue, look up, revoke, plus the use log.
pub trait TokenStore: Send + Sync {
    /// Insert a new token.
    ///
    /// # Errors
    ///
    /// Fails if the id or fingerprint is already present.
    fn issue(&self, token: AccessToken) -> Result<(), TokenStoreError>;

    fn lookup(&self, id: TokenId) -> Option<AccessToken>;

    fn lookup_fingerprint(&self, fingerprint: &SecretFingerprint) -> Option<AccessToken>;

    /// Mark the token revoked at `at`, keeping an earlier revocation time if
    /// one exists. Returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`TokenStoreError::NotFound`] for an unknown id.
    fn revoke(&self, id: TokenId, at: DateTime<Utc>) -> Result<AccessToken, TokenStoreError>;

    fn record_use(&self, entry: TokenUse);

    fn uses(&self, id: TokenId) -> Vec<TokenUse>;
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<TokenId, AccessToken>,
    by_fingerprint: HashMap<SecretFingerprint, TokenId>,
    uses: VecDeque<TokenUse>,
}

/// Entries kept in the in-memory use log; the oldest are dropped first.
pub const USE_LOG_CAPACITY: usize = 4096;

/// Lock-guarded maps, for tests and single-process deployments.
///
/// The use log is a ring of the last [`USE_LOG_CAPACITY`] presentations. A
/// deployment that needs the full audit trail implements [`TokenStore`] over
/// durable storage.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<Inner>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenStore for InMemoryTokenStore {
    fn issue(&self, token: AccessToken) -> Result<(), TokenStoreError> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&token.id) {
            return Err(TokenStoreError::DuplicateId { id: token.id });
        }
        if inner.by_fingerprint.contains_key(&token.fingerprint) {
            return Err(TokenStoreError::DuplicateFingerprint);
        }
        inner.by_fingerprint.insert(token.fingerprint, token.id);
        inner.by_id.insert(token.id, token);
        Ok(())
    }

    fn lookup(&self, id: TokenId) -> Option<AccessToken> {
        self.inner.read().by_id.get(&id).cloned()
    }

    fn lookup_fingerprint(&self, fingerprint: &SecretFingerprint) -> Option<AccessToken> {
        let inner = self.inner.read();
        let id = inner.by_fingerprint.get(fingerprint)?;
        inner.by_id.get(id).cloned()
    }

    fn revoke(&self, id: TokenId, at: DateTime<Utc>) -> Result<AccessToken, TokenStoreError> {
        let mut inner = self.inner.write();
        let token = inner
            .by_id
            .get_mut(&id)
            .ok_or(TokenStoreError::NotFound { id })?;
        if token.revoked_at.is_none() {
            token.revoked_at = Some(at);
        }
        Ok(token.clone())
    }

    fn record_use(&self, entry: TokenUse) {
        let mut inner = self.inner.write();
        if inner.uses.len() == USE_LOG_CAPACITY {
            inner.uses.pop_front();
        }
        inner.uses.push_back(entry);
    }

    fn uses(&self, id: TokenId) -> Vec<TokenUse> {
        self.inner
            .read()
            .uses
            .iter()
            .filter(|u| u.token_id == id)
            .cloned()
            .collect()
    }
}
