use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::snapshot::PermissionSnapshot;
use super::{Action, Decision, DecisionReason, GrantSource};
use crate::catalog::FunctionCatalog;
use crate::utils::is_unexpired;

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Decide whether the snapshot's user may perform `action` on `function_id`
    /// at instant `now`. Must not touch any store.
    fn resolve(
        &self,
        snapshot: &PermissionSnapshot,
        function_id: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Decision;
}

/// Default resolver: a permissive union of four sources.
///
/// Evaluation order (first match wins):
/// 1. super-admin role -> allow
/// 2. executive position matrix row with the requested flag set -> allow
/// 3. active, unexpired membership in an active group whose grant is enabled
///    and at a sufficient level -> allow
/// 4. active, unexpired individual override for the function's module, for
///    `access` only -> allow
/// 5. deny
///
/// A row that exists but does not grant is never a veto; evaluation moves on.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    catalog: Arc<FunctionCatalog>,
}

impl PermissionResolver {
    pub fn new(catalog: Arc<FunctionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FunctionCatalog {
        &self.catalog
    }

    fn position_grants(snapshot: &PermissionSnapshot, function_id: &str, action: Action) -> bool {
        let profile = &snapshot.profile;
        if !profile.is_exec_board {
            return false;
        }
        let Some(position) = profile.exec_board_position else {
            return false;
        };

        match snapshot.position_grants.get(function_id) {
            Some(grant) if grant.position == position => match action {
                Action::Access => grant.can_access,
                Action::Manage => grant.can_manage,
            },
            _ => false,
        }
    }

    fn granting_group<'a>(
        snapshot: &'a PermissionSnapshot,
        function_id: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Option<&'a str> {
        snapshot
            .memberships
            .iter()
            .filter(|m| m.group_is_active && m.membership.is_active)
            .filter(|m| is_unexpired(m.membership.expires_at, now))
            .find(|m| {
                m.grants
                    .get(function_id)
                    .map(|g| g.enabled && g.level.satisfies(action))
                    .unwrap_or(false)
            })
            .map(|m| m.group_name.as_str())
    }

    fn override_grants(
        &self,
        snapshot: &PermissionSnapshot,
        function_id: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> bool {
        // Overrides are module-level and never confer `manage`.
        if action != Action::Access {
            return false;
        }
        let Some(function) = self.catalog.get(function_id) else {
            return false;
        };
        let email = crate::utils::normalize_email(&snapshot.profile.email);

        snapshot.overrides.iter().any(|o| {
            o.is_active
                && is_unexpired(o.expires_at, now)
                && o.module_name == function.module
                && crate::utils::normalize_email(&o.user_email) == email
        })
    }

    /// Access and manage decisions for every catalog function.
    pub fn effective_permissions(
        &self,
        snapshot: &PermissionSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<EffectivePermission> {
        self.catalog
            .list_functions()
            .iter()
            .map(|function| {
                let access = self.resolve(snapshot, &function.id, Action::Access, now);
                let manage = self.resolve(snapshot, &function.id, Action::Manage, now);
                EffectivePermission {
                    function_id: function.id.clone(),
                    category: function.category.clone(),
                    can_access: access.allowed,
                    access_source: access.source,
                    can_manage: manage.allowed,
                    manage_source: manage.source,
                }
            })
            .collect()
    }
}

impl PolicyEvaluator for PermissionResolver {
    fn resolve(
        &self,
        snapshot: &PermissionSnapshot,
        function_id: &str,
        action: Action,
        now: DateTime<Utc>,
    ) -> Decision {
        let user_id = snapshot.profile.user_id;

        // 1. Super admin bypasses all checks
        if snapshot.profile.is_super_admin() {
            tracing::debug!(%user_id, function_id, ?action, "super_admin bypass");
            return Decision::allow(GrantSource::Role, DecisionReason::SuperAdmin);
        }

        // 2. Executive position matrix
        if Self::position_grants(snapshot, function_id, action) {
            tracing::debug!(%user_id, function_id, ?action, "position grant match");
            return Decision::allow(GrantSource::Position, DecisionReason::PositionGrant);
        }

        // 3. Group grants
        if let Some(group) = Self::granting_group(snapshot, function_id, action, now) {
            tracing::debug!(%user_id, function_id, ?action, group, "group grant match");
            return Decision::allow(GrantSource::Group, DecisionReason::GroupGrant);
        }

        // 4. Individual override
        if self.override_grants(snapshot, function_id, action, now) {
            tracing::debug!(%user_id, function_id, ?action, "individual override match");
            return Decision::allow(GrantSource::Individual, DecisionReason::IndividualOverride);
        }

        // 5. Deny
        tracing::debug!(%user_id, function_id, ?action, "no grant");
        Decision::deny()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EffectivePermission {
    pub function_id: String,
    pub category: String,
    pub can_access: bool,
    pub access_source: Option<GrantSource>,
    pub can_manage: bool,
    pub manage_source: Option<GrantSource>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::snapshot::MembershipSnapshot;
    use crate::models::group::{GrantLevel, GrantScope, GroupFunctionGrant, GroupMembership};
    use crate::models::individual::IndividualOverride;
    use crate::models::position::PositionFunctionGrant;
    use crate::models::profile::{ExecPosition, Profile, Role};
    use chrono::Duration;
    use uuid::Uuid;

    fn resolver() -> PermissionResolver {
        PermissionResolver::new(Arc::new(FunctionCatalog::builtin()))
    }

    fn member() -> Profile {
        Profile::new(Uuid::new_v4(), "member@example.com", Role::Member)
    }

    fn membership(user: &Profile, expires_at: Option<DateTime<Utc>>) -> GroupMembership {
        GroupMembership {
            user_id: user.user_id,
            group_id: Uuid::new_v4(),
            is_active: true,
            expires_at,
            assigned_by: None,
            assigned_at: Utc::now(),
        }
    }

    fn grant(group_id: Uuid, function_id: &str, level: GrantLevel) -> GroupFunctionGrant {
        GroupFunctionGrant {
            group_id,
            function_id: function_id.to_string(),
            enabled: true,
            level,
            scope: GrantScope::System,
        }
    }

    fn group_snapshot(
        user: &Profile,
        function_id: &str,
        level: GrantLevel,
        expires_at: Option<DateTime<Utc>>,
    ) -> PermissionSnapshot {
        let m = membership(user, expires_at);
        let g = grant(m.group_id, function_id, level);
        PermissionSnapshot::new(user.clone())
            .with_membership(MembershipSnapshot::new(m, "Tour Manager").with_grants([g]))
    }

    fn position_grant(position: ExecPosition, function_id: &str, access: bool, manage: bool) -> PositionFunctionGrant {
        PositionFunctionGrant {
            position,
            function_id: function_id.to_string(),
            can_access: access,
            can_manage: manage,
        }
    }

    fn override_for(email: &str, module: &str, expires_at: Option<DateTime<Utc>>) -> IndividualOverride {
        IndividualOverride {
            user_email: email.to_string(),
            module_name: module.to_string(),
            is_active: true,
            expires_at,
            granted_by: None,
            granted_at: Utc::now(),
            notes: None,
        }
    }

    #[test]
    fn super_admin_is_allowed_everything() {
        let resolver = resolver();
        let snapshot = PermissionSnapshot::new(Profile::new(Uuid::new_v4(), "root@example.com", Role::SuperAdmin));
        let now = Utc::now();

        for function in resolver.catalog().list_functions() {
            for action in [Action::Access, Action::Manage] {
                let decision = resolver.resolve(&snapshot, &function.id, action, now);
                assert!(decision.allowed, "{} {:?}", function.id, action);
                assert_eq!(decision.source, Some(GrantSource::Role));
            }
        }
        assert!(resolver.resolve(&snapshot, "not.in.catalog", Action::Manage, now).allowed);
    }

    #[test]
    fn plain_member_without_grants_is_denied() {
        let decision = resolver().resolve(&PermissionSnapshot::new(member()), "tours.manage", Action::Access, Utc::now());
        assert!(!decision.allowed);
        assert_eq!(decision.reason, DecisionReason::NoGrant);
        assert_eq!(decision.source, None);
    }

    #[test]
    fn position_grant_reads_the_flag_for_the_action() {
        let profile = member().with_position(ExecPosition::TourManager);
        let snapshot = PermissionSnapshot::new(profile)
            .with_position_grants([position_grant(ExecPosition::TourManager, "tours.manage", true, false)]);
        let resolver = resolver();
        let now = Utc::now();

        let access = resolver.resolve(&snapshot, "tours.manage", Action::Access, now);
        assert!(access.allowed);
        assert_eq!(access.source, Some(GrantSource::Position));
        assert!(!resolver.resolve(&snapshot, "tours.manage", Action::Manage, now).allowed);
    }

    #[test]
    fn false_position_row_does_not_veto_group_grant() {
        let profile = member().with_position(ExecPosition::Treasurer);
        let mut snapshot = group_snapshot(&profile, "dues.manage", GrantLevel::Edit, None);
        snapshot = snapshot.with_position_grants([position_grant(ExecPosition::Treasurer, "dues.manage", false, false)]);

        let decision = resolver().resolve(&snapshot, "dues.manage", Action::Manage, Utc::now());
        assert!(decision.allowed);
        assert_eq!(decision.source, Some(GrantSource::Group));
    }

    #[test]
    fn missing_position_row_falls_through_to_overrides() {
        let profile = member().with_position(ExecPosition::Chaplain);
        let snapshot = PermissionSnapshot::new(profile.clone())
            .with_override(override_for(&profile.email, "tours", None));

        let decision = resolver().resolve(&snapshot, "tours.view", Action::Access, Utc::now());
        assert!(decision.allowed);
        assert_eq!(decision.source, Some(GrantSource::Individual));
    }

    #[test]
    fn position_grant_ignored_when_not_on_board() {
        let mut profile = member().with_position(ExecPosition::President);
        profile.is_exec_board = false;
        let snapshot = PermissionSnapshot::new(profile)
            .with_position_grants([position_grant(ExecPosition::President, "exec.dashboard", true, true)]);

        assert!(!resolver().resolve(&snapshot, "exec.dashboard", Action::Access, Utc::now()).allowed);
    }

    #[test]
    fn membership_expiry_is_evaluated_against_now() {
        let user = member();
        let now = Utc::now();
        let resolver = resolver();

        let expired = group_snapshot(&user, "tours.manage", GrantLevel::Edit, Some(now - Duration::seconds(1)));
        assert!(!resolver.resolve(&expired, "tours.manage", Action::Access, now).allowed);

        let live = group_snapshot(&user, "tours.manage", GrantLevel::Edit, Some(now + Duration::seconds(1)));
        assert!(resolver.resolve(&live, "tours.manage", Action::Access, now).allowed);

        // The same snapshot stops granting once the clock passes expiry.
        assert!(!resolver.resolve(&live, "tours.manage", Action::Access, now + Duration::seconds(2)).allowed);
    }

    #[test]
    fn view_level_grants_access_but_not_manage() {
        let user = member();
        let snapshot = group_snapshot(&user, "tours.manage", GrantLevel::View, None);
        let resolver = resolver();
        let now = Utc::now();

        assert!(resolver.resolve(&snapshot, "tours.manage", Action::Access, now).allowed);
        let manage = resolver.resolve(&snapshot, "tours.manage", Action::Manage, now);
        assert!(!manage.allowed);
        assert_eq!(manage.reason, DecisionReason::NoGrant);
    }

    #[test]
    fn edit_level_grants_access_and_manage() {
        let user = member();
        let snapshot = group_snapshot(&user, "tours.manage", GrantLevel::Edit, None);
        let resolver = resolver();
        let now = Utc::now();

        let access = resolver.resolve(&snapshot, "tours.manage", Action::Access, now);
        let manage = resolver.resolve(&snapshot, "tours.manage", Action::Manage, now);
        assert!(access.allowed && manage.allowed);
        assert_eq!(manage.source, Some(GrantSource::Group));
    }

    #[test]
    fn disabled_grant_inactive_membership_and_inactive_group_do_not_grant() {
        let user = member();
        let now = Utc::now();
        let resolver = resolver();

        let mut disabled = group_snapshot(&user, "tours.manage", GrantLevel::Admin, None);
        for m in &mut disabled.memberships {
            for g in m.grants.values_mut() {
                g.enabled = false;
            }
        }
        assert!(!resolver.resolve(&disabled, "tours.manage", Action::Access, now).allowed);

        let mut inactive = group_snapshot(&user, "tours.manage", GrantLevel::Admin, None);
        inactive.memberships[0].membership.is_active = false;
        assert!(!resolver.resolve(&inactive, "tours.manage", Action::Access, now).allowed);

        let mut dormant_group = group_snapshot(&user, "tours.manage", GrantLevel::Admin, None);
        dormant_group.memberships[0].group_is_active = false;
        assert!(!resolver.resolve(&dormant_group, "tours.manage", Action::Access, now).allowed);
    }

    #[test]
    fn overrides_grant_access_only_for_their_module() {
        let user = member();
        let now = Utc::now();
        let snapshot = PermissionSnapshot::new(user.clone())
            .with_override(override_for("MEMBER@example.com", "tours", None));
        let resolver = resolver();

        assert!(resolver.resolve(&snapshot, "tours.manage", Action::Access, now).allowed);
        assert!(!resolver.resolve(&snapshot, "tours.manage", Action::Manage, now).allowed);
        assert!(!resolver.resolve(&snapshot, "wardrobe.view", Action::Access, now).allowed);
    }

    #[test]
    fn expired_or_inactive_override_is_absent() {
        let user = member();
        let now = Utc::now();
        let resolver = resolver();

        let expired = PermissionSnapshot::new(user.clone())
            .with_override(override_for(&user.email, "tours", Some(now - Duration::seconds(1))));
        assert!(!resolver.resolve(&expired, "tours.view", Action::Access, now).allowed);

        let mut revoked = override_for(&user.email, "tours", None);
        revoked.is_active = false;
        let inactive = PermissionSnapshot::new(user).with_override(revoked);
        assert!(!resolver.resolve(&inactive, "tours.view", Action::Access, now).allowed);
    }

    #[test]
    fn effective_permissions_cover_the_catalog() {
        let user = member();
        let snapshot = group_snapshot(&user, "tours.manage", GrantLevel::View, None);
        let resolver = resolver();

        let effective = resolver.effective_permissions(&snapshot, Utc::now());
        assert_eq!(effective.len(), resolver.catalog().len());
        let tours = effective.iter().find(|e| e.function_id == "tours.manage").unwrap();
        assert!(tours.can_access);
        assert!(!tours.can_manage);
        assert_eq!(tours.access_source, Some(GrantSource::Group));
    }
}
