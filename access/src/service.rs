//! External access token service: issue, revoke, authorize.
//!
//! Authorization checks, in order: the token exists, is not revoked, is not
//! expired, and its scope matches the request. Every failure reaches the
//! caller as the same [`AccessDenied`]; the specific reason only goes to the
//! log.

use std::sync::Arc;

use aer_report::{ReportKind, ReportSelector};
use chrono::Duration;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use crate::clock::Clock;
use crate::policy::{AccessPolicy, Actor, MIN_TTL_MINUTES};
use crate::store::{TokenStore, TokenStoreError};
use crate::token::{
    AccessToken, DocumentFormat, IssuedToken, SecretFingerprint, TokenId, TokenScope, TokenSecret,
    TokenState,
};

/// What to issue a token for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub selector: ReportSelector,
    pub kind: ReportKind,
    pub format: DocumentFormat,
    /// `None` uses the policy default.
    pub ttl_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueError {
    #[error("user {user_id} may not manage tokens for clinic {clinic_id}")]
    Forbidden { user_id: String, clinic_id: String },
    #[error("ttl of {requested} minutes is outside {min}..={max}")]
    TtlOutOfRange { requested: u32, min: u32, max: u32 },
    #[error(transparent)]
    Store(#[from] TokenStoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevokeError {
    #[error("token {id} not found")]
    NotFound { id: TokenId },
    #[error("user {user_id} may not revoke token {id}")]
    Forbidden { user_id: String, id: TokenId },
}

/// Uniform authorization failure. Deliberately carries no reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired token")]
pub struct AccessDenied {
    /// Set when the secret matched a stored token, for the use log.
    pub(crate) token_id: Option<TokenId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DenyReason {
    MissingSecret,
    UnknownToken,
    Revoked,
    Expired,
    ScopeMismatch,
}

impl DenyReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingSecret => "missing_secret",
            Self::UnknownToken => "unknown_token",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
            Self::ScopeMismatch => "scope_mismatch",
        }
    }
}

pub struct AccessService {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    policy: AccessPolicy,
}

impl std::fmt::Debug for AccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessService")
            .field("clock", &self.clock)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl AccessService {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, policy: AccessPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Issue a token. The secret in the result is the only copy.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::Forbidden`] if `actor` may not manage tokens for
    /// the clinic, [`IssueError::TtlOutOfRange`] for a lifetime outside policy,
    /// or a store error.
    pub fn issue(&self, actor: &Actor, request: IssueRequest) -> Result<IssuedToken, IssueError> {
        let clinic_id = &request.selector.clinic_id;
        if !actor.can_administer(clinic_id) {
            return Err(IssueError::Forbidden {
                user_id: actor.user_id.clone(),
                clinic_id: clinic_id.clone(),
            });
        }
        let ttl = request.ttl_minutes.unwrap_or(self.policy.default_ttl_minutes);
        if !(MIN_TTL_MINUTES..=self.policy.max_ttl_minutes).contains(&ttl) {
            return Err(IssueError::TtlOutOfRange {
                requested: ttl,
                min: MIN_TTL_MINUTES,
                max: self.policy.max_ttl_minutes,
            });
        }

        let secret = TokenSecret::generate(&mut OsRng);
        let created_at = self.clock.now();
        let token = AccessToken {
            id: TokenId::new_v4(),
            fingerprint: secret.fingerprint(),
            selector: request.selector,
            kind: request.kind,
            format: request.format,
            created_by: actor.user_id.clone(),
            created_at,
            expires_at: created_at + Duration::minutes(i64::from(ttl)),
            revoked_at: None,
        };
        self.store.issue(token.clone())?;
        tracing::info!(
            token_id = %token.id,
            report_id = %token.report_id(),
            format = %token.format,
            ttl_minutes = ttl,
            created_by = %token.created_by,
            "issued external access token"
        );
        Ok(IssuedToken { token, secret })
    }

    /// Revoke a token immediately. Revocation is permanent; revoking again
    /// keeps the first timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RevokeError`] for an unknown id or an actor without access to
    /// the token's clinic.
    pub fn revoke(&self, actor: &Actor, id: TokenId) -> Result<AccessToken, RevokeError> {
        let token = self.store.lookup(id).ok_or(RevokeError::NotFound { id })?;
        if !actor.can_administer(&token.selector.clinic_id) {
            return Err(RevokeError::Forbidden {
                user_id: actor.user_id.clone(),
                id,
            });
        }
        let revoked = self
            .store
            .revoke(id, self.clock.now())
            .map_err(|_| RevokeError::NotFound { id })?;
        tracing::info!(token_id = %id, revoked_by = %actor.user_id, "revoked external access token");
        Ok(revoked)
    }

    /// Authorize `presented` for exactly `requested`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] on any failure.
    pub fn authorize(&self, presented: &str, requested: &TokenScope) -> Result<AccessToken, AccessDenied> {
        self.authorize_with(presented, |scope| scope == requested)
    }

    /// Authorize `presented` for a document kind and format, with clinic and
    /// client taken from the token itself (external mode).
    ///
    /// # Errors
    ///
    /// Returns [`AccessDenied`] on any failure.
    pub fn authorize_document(
        &self,
        presented: &str,
        kind: ReportKind,
        format: DocumentFormat,
    ) -> Result<AccessToken, AccessDenied> {
        self.authorize_with(presented, |scope| scope.kind == kind && scope.format == format)
    }

    fn authorize_with(
        &self,
        presented: &str,
        scope_matches: impl Fn(&TokenScope) -> bool,
    ) -> Result<AccessToken, AccessDenied> {
        match self.check(presented, scope_matches) {
            Ok(token) => Ok(token),
            Err((reason, token_id)) => {
                tracing::warn!(
                    reason = reason.as_str(),
                    token_id = token_id.map(|id| id.to_string()).as_deref().unwrap_or(""),
                    "external access denied"
                );
                Err(AccessDenied { token_id })
            }
        }
    }

    fn check(
        &self,
        presented: &str,
        scope_matches: impl Fn(&TokenScope) -> bool,
    ) -> Result<AccessToken, (DenyReason, Option<TokenId>)> {
        let presented = presented.trim();
        if presented.is_empty() {
            return Err((DenyReason::MissingSecret, None));
        }
        let fingerprint = SecretFingerprint::of(presented);
        let token = self
            .store
            .lookup_fingerprint(&fingerprint)
            .ok_or((DenyReason::UnknownToken, None))?;
        if !bool::from(token.fingerprint.as_bytes().ct_eq(fingerprint.as_bytes())) {
            return Err((DenyReason::UnknownToken, None));
        }
        match token.state_at(self.clock.now()) {
            TokenState::Revoked => return Err((DenyReason::Revoked, Some(token.id))),
            TokenState::Expired => return Err((DenyReason::Expired, Some(token.id))),
            TokenState::Active => {}
        }
        if !scope_matches(&token.scope()) {
            return Err((DenyReason::ScopeMismatch, Some(token.id)));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::policy::{AccessPolicyConfig, Role, MAX_TTL_MINUTES};
    use crate::store::InMemoryTokenStore;
    use aer_report::ReportPeriod;
    use chrono::{TimeZone, Utc};

    fn setup() -> (AccessService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()));
        let service = AccessService::new(
            Arc::new(InMemoryTokenStore::new()),
            clock.clone(),
            AccessPolicy::default(),
        );
        (service, clock)
    }

    fn admin() -> Actor {
        Actor::new("admin-1", Role::ClinicAdmin, &["C1"])
    }

    fn request(format: DocumentFormat, ttl: Option<u32>) -> IssueRequest {
        let period = ReportPeriod::parse("2026-01-01", "2026-01-31").unwrap();
        IssueRequest {
            selector: ReportSelector::new("C1", "U1", period, None).unwrap(),
            kind: ReportKind::Aer,
            format,
            ttl_minutes: ttl,
        }
    }

    fn scope(client: &str, format: DocumentFormat) -> TokenScope {
        TokenScope {
            clinic_id: "C1".into(),
            client_id: client.into(),
            kind: ReportKind::Aer,
            format,
        }
    }

    #[test]
    fn default_ttl_is_sixty_minutes() {
        let (service, clock) = setup();
        let issued = service.issue(&admin(), request(DocumentFormat::Pdf, None)).unwrap();
        assert_eq!(issued.token.expires_at, clock.now() + Duration::minutes(60));
        assert!(issued.fetch_path().starts_with("/api/v1/external/aer.pdf?token="));
    }

    #[test]
    fn ttl_outside_range_is_rejected() {
        let (service, _) = setup();
        for ttl in [0, MAX_TTL_MINUTES + 1] {
            assert!(matches!(
                service.issue(&admin(), request(DocumentFormat::Pdf, Some(ttl))),
                Err(IssueError::TtlOutOfRange { .. })
            ));
        }
        assert!(service
            .issue(&admin(), request(DocumentFormat::Pdf, Some(MAX_TTL_MINUTES)))
            .is_ok());
    }

    #[test]
    fn configured_policy_bounds_ttl() {
        let config = AccessPolicyConfig {
            default_ttl_minutes: None,
            max_ttl_minutes: Some(30),
        };
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap()));
        let service = AccessService::new(
            Arc::new(InMemoryTokenStore::new()),
            clock,
            AccessPolicy::from_config(&config),
        );
        let issued = service.issue(&admin(), request(DocumentFormat::Pdf, None)).unwrap();
        assert_eq!(issued.token.expires_at - issued.token.created_at, Duration::minutes(30));
        assert!(service.issue(&admin(), request(DocumentFormat::Pdf, Some(31))).is_err());
    }

    #[test]
    fn non_member_cannot_issue() {
        let (service, _) = setup();
        let outsider = Actor::new("x", Role::ClinicAdmin, &["C2"]);
        assert!(matches!(
            service.issue(&outsider, request(DocumentFormat::Pdf, None)),
            Err(IssueError::Forbidden { .. })
        ));
        let therapist = Actor::new("t", Role::Therapist, &["C1"]);
        assert!(service.issue(&therapist, request(DocumentFormat::Pdf, None)).is_err());
    }

    #[test]
    fn lifecycle_active_then_expired() {
        let (service, clock) = setup();
        let issued = service.issue(&admin(), request(DocumentFormat::Pdf, Some(10))).unwrap();
        let secret = issued.secret.expose();
        let want = scope("U1", DocumentFormat::Pdf);

        assert!(service.authorize(secret, &want).is_ok());
        clock.advance(Duration::minutes(9) + Duration::seconds(59));
        assert!(service.authorize(secret, &want).is_ok());
        clock.advance(Duration::seconds(1));
        assert!(service.authorize(secret, &want).is_err());
    }

    #[test]
    fn revoked_token_fails_with_ttl_remaining() {
        let (service, _) = setup();
        let issued = service.issue(&admin(), request(DocumentFormat::Pdf, None)).unwrap();
        let want = scope("U1", DocumentFormat::Pdf);
        assert!(service.authorize(issued.secret.expose(), &want).is_ok());

        let revoked = service.revoke(&admin(), issued.token.id).unwrap();
        assert!(revoked.revoked_at.is_some());
        let err = service.authorize(issued.secret.expose(), &want).unwrap_err();
        assert_eq!(err.token_id, Some(issued.token.id));
    }

    #[test]
    fn scope_mismatch_looks_like_unknown() {
        let (service, _) = setup();
        let issued = service.issue(&admin(), request(DocumentFormat::Pdf, None)).unwrap();
        let secret = issued.secret.expose();

        let wrong_format = service.authorize(secret, &scope("U1", DocumentFormat::Json)).unwrap_err();
        let wrong_client = service.authorize(secret, &scope("U2", DocumentFormat::Pdf)).unwrap_err();
        let unknown = service.authorize("deadbeef", &scope("U1", DocumentFormat::Pdf)).unwrap_err();
        assert_eq!(wrong_format.to_string(), unknown.to_string());
        assert_eq!(wrong_client.to_string(), unknown.to_string());
    }

    #[test]
    fn blank_secret_is_denied() {
        let (service, _) = setup();
        assert!(service.authorize_document("  ", ReportKind::Aer, DocumentFormat::Pdf).is_err());
    }

    #[test]
    fn revoke_checks_membership_and_existence() {
        let (service, _) = setup();
        let issued = service.issue(&admin(), request(DocumentFormat::Json, None)).unwrap();
        let outsider = Actor::new("x", Role::ClinicAdmin, &["C2"]);
        assert!(matches!(
            service.revoke(&outsider, issued.token.id),
            Err(RevokeError::Forbidden { .. })
        ));
        let missing = TokenId::new_v4();
        assert_eq!(
            service.revoke(&admin(), missing).unwrap_err(),
            RevokeError::NotFound { id: missing }
        );
    }
}
