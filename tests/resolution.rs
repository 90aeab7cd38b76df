mod common;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use uuid::Uuid;

use member_authz::authz::{authorize, Action, GrantSource, PermissionResolver, SnapshotSource};
use member_authz::catalog::FunctionCatalog;
use member_authz::errors::AppError;
use member_authz::models::group::GrantLevel;
use member_authz::models::individual::GrantOverrideRequest;
use member_authz::models::position::PositionGrantRequest;
use member_authz::models::profile::ExecPosition;
use member_authz::store::{groups, memberships, overrides, positions};

use common::{grant, insert_profile, make_group, test_db};

fn resolver() -> PermissionResolver {
    PermissionResolver::new(Arc::new(FunctionCatalog::builtin()))
}

#[tokio::test]
async fn tour_manager_group_with_edit_grants_access_and_manage() -> Result<()> {
    let db = test_db().await?;
    let catalog = FunctionCatalog::builtin();
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    groups::set_group_grant(&db.pool, &catalog, admin, group.id, "tours.manage", grant(GrantLevel::Edit)).await?;
    memberships::assign_membership(&db.pool, admin, user, group.id, Some(Utc::now() + Duration::days(1))).await?;

    let resolver = resolver();
    let access = authorize(&db.pool, &resolver, user, "tours.manage", Action::Access, Utc::now()).await?;
    let manage = authorize(&db.pool, &resolver, user, "tours.manage", Action::Manage, Utc::now()).await?;
    assert!(access.allowed);
    assert!(manage.allowed);
    assert_eq!(manage.source, Some(GrantSource::Group));
    Ok(())
}

#[tokio::test]
async fn tour_manager_group_with_view_grants_access_only() -> Result<()> {
    let db = test_db().await?;
    let catalog = FunctionCatalog::builtin();
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    groups::set_group_grant(&db.pool, &catalog, admin, group.id, "tours.manage", grant(GrantLevel::View)).await?;
    memberships::assign_membership(&db.pool, admin, user, group.id, None).await?;

    let resolver = resolver();
    let access = authorize(&db.pool, &resolver, user, "tours.manage", Action::Access, Utc::now()).await?;
    let manage = authorize(&db.pool, &resolver, user, "tours.manage", Action::Manage, Utc::now()).await?;
    assert!(access.allowed);
    assert!(!manage.allowed);
    Ok(())
}

#[tokio::test]
async fn expired_and_deactivated_sources_stop_granting() -> Result<()> {
    let db = test_db().await?;
    let catalog = FunctionCatalog::builtin();
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Librarians", false).await?;
    groups::set_group_grant(&db.pool, &catalog, admin, group.id, "library.manage", grant(GrantLevel::Full)).await?;

    let resolver = resolver();
    let expiry = Utc::now() + Duration::hours(1);
    memberships::assign_membership(&db.pool, admin, user, group.id, Some(expiry)).await?;

    let before = expiry - Duration::seconds(1);
    let after = expiry + Duration::seconds(1);
    assert!(authorize(&db.pool, &resolver, user, "library.manage", Action::Manage, before).await?.allowed);
    assert!(!authorize(&db.pool, &resolver, user, "library.manage", Action::Manage, after).await?.allowed);

    groups::deactivate_group(&db.pool, admin, group.id).await?;
    assert!(!authorize(&db.pool, &resolver, user, "library.manage", Action::Manage, before).await?.allowed);
    Ok(())
}

#[tokio::test]
async fn position_matrix_applies_to_board_members_of_that_position() -> Result<()> {
    let db = test_db().await?;
    let catalog = FunctionCatalog::builtin();
    let root = insert_profile(&db.pool, "root@example.com", "super-admin", None).await?;
    let treasurer = insert_profile(&db.pool, "t@example.com", "executive", Some("treasurer")).await?;
    let secretary = insert_profile(&db.pool, "s@example.com", "executive", Some("secretary")).await?;

    let req = PositionGrantRequest { can_access: true, can_manage: true };
    positions::set_position_grant(&db.pool, &catalog, root, ExecPosition::Treasurer, "dues.manage", req).await?;

    let resolver = resolver();
    let decision = authorize(&db.pool, &resolver, treasurer, "dues.manage", Action::Manage, Utc::now()).await?;
    assert!(decision.allowed);
    assert_eq!(decision.source, Some(GrantSource::Position));

    let decision = authorize(&db.pool, &resolver, secretary, "dues.manage", Action::Access, Utc::now()).await?;
    assert!(!decision.allowed);
    Ok(())
}

#[tokio::test]
async fn unknown_board_position_is_treated_as_none() -> Result<()> {
    let db = test_db().await?;
    let user = insert_profile(&db.pool, "x@example.com", "executive", Some("grand-vizier")).await?;

    let snapshot = db.pool.load_snapshot(user).await?;
    assert!(snapshot.profile.exec_board_position.is_none());
    assert!(snapshot.position_grants.is_empty());
    Ok(())
}

#[tokio::test]
async fn individual_override_grants_module_access_by_email() -> Result<()> {
    let db = test_db().await?;
    let catalog = FunctionCatalog::builtin();
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "Ada@Example.com", "member", None).await?;

    let req = GrantOverrideRequest {
        user_email: "ada@example.com".to_string(),
        module_name: "tours".to_string(),
        expires_at: None,
        notes: None,
    };
    overrides::grant_override(&db.pool, &catalog, admin, req).await?;

    let resolver = resolver();
    for function in ["tours.view", "tours.manage", "tours.budget"] {
        let decision = authorize(&db.pool, &resolver, user, function, Action::Access, Utc::now()).await?;
        assert!(decision.allowed, "{function}");
        assert_eq!(decision.source, Some(GrantSource::Individual));
    }
    let manage = authorize(&db.pool, &resolver, user, "tours.manage", Action::Manage, Utc::now()).await?;
    assert!(!manage.allowed);
    let other = authorize(&db.pool, &resolver, user, "wardrobe.view", Action::Access, Utc::now()).await?;
    assert!(!other.allowed);
    Ok(())
}

#[tokio::test]
async fn super_admin_is_allowed_everything() -> Result<()> {
    let db = test_db().await?;
    let root = insert_profile(&db.pool, "root@example.com", "super_admin", None).await?;
    let catalog = FunctionCatalog::builtin();

    let resolver = resolver();
    for function in catalog.list_functions() {
        for action in [Action::Access, Action::Manage] {
            let decision = authorize(&db.pool, &resolver, root, &function.id, action, Utc::now()).await?;
            assert!(decision.allowed, "{} {:?}", function.id, action);
            assert_eq!(decision.source, Some(GrantSource::Role));
        }
    }
    Ok(())
}

#[tokio::test]
async fn snapshot_of_unknown_user_is_not_found() -> Result<()> {
    let db = test_db().await?;
    let err = db.pool.load_snapshot(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn effective_permissions_cover_the_whole_catalog() -> Result<()> {
    let db = test_db().await?;
    let catalog = FunctionCatalog::builtin();
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Wardrobe", false).await?;
    groups::set_group_grant(&db.pool, &catalog, admin, group.id, "wardrobe.view", grant(GrantLevel::View)).await?;
    memberships::assign_membership(&db.pool, admin, user, group.id, None).await?;

    let snapshot = db.pool.load_snapshot(user).await?;
    let grid = resolver().effective_permissions(&snapshot, Utc::now());
    assert_eq!(grid.len(), catalog.len());

    let wardrobe = grid.iter().find(|p| p.function_id == "wardrobe.view").unwrap();
    assert!(wardrobe.can_access && !wardrobe.can_manage);
    assert_eq!(wardrobe.access_source, Some(GrantSource::Group));
    assert_eq!(grid.iter().filter(|p| p.can_access).count(), 1);
    Ok(())
}
