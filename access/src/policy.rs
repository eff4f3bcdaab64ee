//! Token issuance policy and actor roles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Default token lifetime when the issuer does not ask for one.
pub const DEFAULT_TTL_MINUTES: u32 = 60;
/// Shortest lifetime that may be requested.
pub const MIN_TTL_MINUTES: u32 = 1;
/// Longest lifetime that may be requested (seven days).
pub const MAX_TTL_MINUTES: u32 = 60 * 24 * 7;

/// Policy overrides. `None` fields take the constants above.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessPolicyConfig {
    #[serde(default)]
    pub default_ttl_minutes: Option<u32>,
    /// Upper bound; values above [`MAX_TTL_MINUTES`] are lowered to it.
    #[serde(default)]
    pub max_ttl_minutes: Option<u32>,
}

/// Resolved policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub default_ttl_minutes: u32,
    pub max_ttl_minutes: u32,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
            max_ttl_minutes: MAX_TTL_MINUTES,
        }
    }
}

impl AccessPolicy {
    /// Resolve overrides; the default is clamped into `MIN..=max`.
    #[must_use]
    pub fn from_config(config: &AccessPolicyConfig) -> Self {
        let max_ttl_minutes = config
            .max_ttl_minutes
            .unwrap_or(MAX_TTL_MINUTES)
            .clamp(MIN_TTL_MINUTES, MAX_TTL_MINUTES);
        let default_ttl_minutes = config
            .default_ttl_minutes
            .unwrap_or(DEFAULT_TTL_MINUTES)
            .clamp(MIN_TTL_MINUTES, max_ttl_minutes);
        Self {
            default_ttl_minutes,
            max_ttl_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Platform administrator; not bound to clinic membership.
    Admin,
    ClinicAdmin,
    Therapist,
}

/// Authenticated caller of the internal surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub clinic_ids: BTreeSet<String>,
}

impl Actor {
    #[must_use]
    pub fn new(user_id: &str, role: Role, clinic_ids: &[&str]) -> Self {
        Self {
            user_id: user_id.to_string(),
            role,
            clinic_ids: clinic_ids.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Platform admins see every clinic; everyone else needs membership.
    #[must_use]
    pub fn can_access_clinic(&self, clinic_id: &str) -> bool {
        self.role == Role::Admin || self.clinic_ids.contains(clinic_id)
    }

    /// Report export and token management need an administrator.
    #[must_use]
    pub fn can_administer(&self, clinic_id: &str) -> bool {
        matches!(self.role, Role::Admin | Role::ClinicAdmin) && self.can_access_clinic(clinic_id)
    }
}
