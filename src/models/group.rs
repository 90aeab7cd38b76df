use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::Auditable;
use crate::authz::Action;

// =============================================================================
// PERMISSION GROUP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[schema(example = "#6366f1")]
    pub color: String,
    /// Default groups can be edited but never deleted or deactivated.
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Auditable for PermissionGroup {
    fn entity_type() -> &'static str { "group" }
}

pub const DEFAULT_GROUP_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GroupCreateRequest {
    #[schema(example = "Tour Manager")]
    pub name: String,
    #[schema(example = "Plans and runs tours")]
    pub description: Option<String>,
    #[schema(example = "#6366f1")]
    pub color: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct GroupUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

// =============================================================================
// GROUP FUNCTION GRANT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GrantLevel {
    View,
    Edit,
    Full,
    Admin,
}

impl GrantLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantLevel::View => "view",
            GrantLevel::Edit => "edit",
            GrantLevel::Full => "full",
            GrantLevel::Admin => "admin",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "view" => Some(GrantLevel::View),
            "edit" => Some(GrantLevel::Edit),
            "full" => Some(GrantLevel::Full),
            "admin" => Some(GrantLevel::Admin),
            _ => None,
        }
    }

    /// `view` satisfies `access` only; every other level satisfies both.
    pub fn satisfies(&self, action: Action) -> bool {
        match action {
            Action::Access => true,
            Action::Manage => !matches!(self, GrantLevel::View),
        }
    }
}

/// Breadth qualifier carried on a group grant. The resolver does not read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GrantScope {
    Own,
    Department,
    System,
}

impl GrantScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantScope::Own => "own",
            GrantScope::Department => "department",
            GrantScope::System => "system",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "own" => Some(GrantScope::Own),
            "department" => Some(GrantScope::Department),
            "system" => Some(GrantScope::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupFunctionGrant {
    pub group_id: Uuid,
    #[schema(example = "tours.manage")]
    pub function_id: String,
    pub enabled: bool,
    pub level: GrantLevel,
    pub scope: GrantScope,
}

impl Auditable for GroupFunctionGrant {
    fn entity_type() -> &'static str { "group_grant" }
    fn function_id(&self) -> Option<&str> { Some(&self.function_id) }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GroupGrantRequest {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub level: GrantLevel,
    #[serde(default = "default_scope")]
    pub scope: GrantScope,
}

fn default_enabled() -> bool {
    true
}

fn default_scope() -> GrantScope {
    GrantScope::Own
}

// =============================================================================
// GROUP MEMBERSHIP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GroupMembership {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub is_active: bool,
    /// `None` means the membership never expires.
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

impl Auditable for GroupMembership {
    fn entity_type() -> &'static str { "membership" }
    fn target_user(&self) -> Option<Uuid> { Some(self.user_id) }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AssignGroupRequest {
    pub group_id: Uuid,
    /// A timestamp in the past is accepted; the membership then resolves as
    /// already expired.
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_level_only_satisfies_access() {
        assert!(GrantLevel::View.satisfies(Action::Access));
        assert!(!GrantLevel::View.satisfies(Action::Manage));
        for level in [GrantLevel::Edit, GrantLevel::Full, GrantLevel::Admin] {
            assert!(level.satisfies(Action::Access));
            assert!(level.satisfies(Action::Manage));
        }
    }
}
