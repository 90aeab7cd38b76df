//! Authorization module - Permission Resolver and enforcement
//!
//! This module implements the permission resolution core:
//! - Super-admin role bypass
//! - Executive-board position matrix
//! - Permission groups with lazily evaluated expiry
//! - Individual per-module overrides keyed by e-mail
//! - Configurable enforcement modes for the HTTP layer (off/advisory/strict)

mod evaluator;
mod snapshot;

pub use evaluator::{EffectivePermission, PermissionResolver, PolicyEvaluator};
pub use snapshot::{MembershipSnapshot, PermissionSnapshot, SnapshotSource};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppResult;

/// Catalog function guarding the permission administration surface itself.
pub const PERMISSIONS_FUNCTION: &str = "system.permissions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Access,
    Manage,
}

/// Which permission source produced an allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GrantSource {
    Role,
    Position,
    Group,
    Individual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    SuperAdmin,
    PositionGrant,
    GroupGrant,
    IndividualOverride,
    NoGrant,
}

/// Resolver output for one (user, function, action) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub source: Option<GrantSource>,
}

impl Decision {
    pub fn allow(source: GrantSource, reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
            source: Some(source),
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::NoGrant,
            source: None,
        }
    }
}

/// Load a user's snapshot and resolve one decision against it.
pub async fn authorize<S, E>(
    source: &S,
    evaluator: &E,
    user_id: Uuid,
    function_id: &str,
    action: Action,
    now: DateTime<Utc>,
) -> AppResult<Decision>
where
    S: SnapshotSource + ?Sized,
    E: PolicyEvaluator + ?Sized,
{
    let snapshot = source.load_snapshot(user_id).await?;
    Ok(evaluator.resolve(&snapshot, function_id, action, now))
}

/// Authorization enforcement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzMode {
    /// No permission checks on the admin surface (development mode)
    Off,
    /// Log denials but allow requests (rollout mode)
    Advisory,
    /// Enforce 403 on denied requests (production mode)
    Strict,
}

impl AuthzMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "off" => AuthzMode::Off,
            "advisory" => AuthzMode::Advisory,
            _ => AuthzMode::Strict,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(&std::env::var("AUTHZ_MODE").unwrap_or_default())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthzMode::Off => "off",
            AuthzMode::Advisory => "advisory",
            AuthzMode::Strict => "strict",
        }
    }
}
