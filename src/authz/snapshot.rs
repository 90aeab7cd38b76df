use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::group::{GroupFunctionGrant, GroupMembership};
use crate::models::individual::IndividualOverride;
use crate::models::position::PositionFunctionGrant;
use crate::models::profile::Profile;

/// Everything the resolver needs about one user, read in one go.
///
/// Rows are carried as stored: expired or inactive memberships and overrides
/// are kept here and filtered at resolution time against the caller's clock.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    pub profile: Profile,
    /// Matrix rows for the user's board position, keyed by function id.
    pub position_grants: HashMap<String, PositionFunctionGrant>,
    pub memberships: Vec<MembershipSnapshot>,
    pub overrides: Vec<IndividualOverride>,
}

#[derive(Debug, Clone)]
pub struct MembershipSnapshot {
    pub membership: GroupMembership,
    pub group_name: String,
    pub group_is_active: bool,
    /// Group grants keyed by function id.
    pub grants: HashMap<String, GroupFunctionGrant>,
}

impl PermissionSnapshot {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            position_grants: HashMap::new(),
            memberships: Vec::new(),
            overrides: Vec::new(),
        }
    }

    pub fn with_position_grants(mut self, grants: impl IntoIterator<Item = PositionFunctionGrant>) -> Self {
        self.position_grants = grants
            .into_iter()
            .map(|g| (g.function_id.clone(), g))
            .collect();
        self
    }

    pub fn with_membership(mut self, membership: MembershipSnapshot) -> Self {
        self.memberships.push(membership);
        self
    }

    pub fn with_override(mut self, grant: IndividualOverride) -> Self {
        self.overrides.push(grant);
        self
    }
}

impl MembershipSnapshot {
    pub fn new(membership: GroupMembership, group_name: impl Into<String>) -> Self {
        Self {
            membership,
            group_name: group_name.into(),
            group_is_active: true,
            grants: HashMap::new(),
        }
    }

    pub fn with_grants(mut self, grants: impl IntoIterator<Item = GroupFunctionGrant>) -> Self {
        self.grants = grants
            .into_iter()
            .map(|g| (g.function_id.clone(), g))
            .collect();
        self
    }

    pub fn inactive_group(mut self) -> Self {
        self.group_is_active = false;
        self
    }
}

/// Where snapshots come from. The SQLite pool is the production source.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load_snapshot(&self, user_id: Uuid) -> AppResult<PermissionSnapshot>;
}
