mod common;

use anyhow::Result;
use uuid::Uuid;

use member_authz::audit;
use member_authz::bulk::BulkOperationCoordinator;
use member_authz::errors::ErrorKind;
use member_authz::models::audit::AuditQuery;
use member_authz::models::bulk::BulkOperation;
use member_authz::store::memberships;

use common::{insert_profile, make_group, test_db};

async fn membership_rows(pool: &sqlx::SqlitePool, user: Uuid, group: Uuid) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM user_permission_groups WHERE user_id = ? AND group_id = ?")
        .bind(user.to_string())
        .bind(group.to_string())
        .fetch_one(pool)
        .await?)
}

#[tokio::test]
async fn assigning_twice_leaves_one_active_row() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    for _ in 0..2 {
        let result = bulk
            .apply_to_users(admin, &[user], BulkOperation::Assign { group_id: group.id }, None)
            .await?;
        assert_eq!(result.succeeded, vec![user]);
        assert!(result.failed.is_empty());
    }

    assert_eq!(membership_rows(&db.pool, user, group.id).await?, 1);
    let membership = memberships::find_membership(&db.pool, user, group.id).await?.unwrap();
    assert!(membership.is_active);
    Ok(())
}

#[tokio::test]
async fn one_failing_user_does_not_abort_the_batch() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let u1 = insert_profile(&db.pool, "u1@example.com", "member", None).await?;
    let u2 = Uuid::new_v4();
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    let result = bulk
        .apply_to_users(admin, &[u1, u2], BulkOperation::Assign { group_id: group.id }, None)
        .await?;

    assert_eq!(result.succeeded, vec![u1]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].user_id, u2);
    assert_eq!(result.failed[0].error, ErrorKind::NotFound);
    assert!(result.is_partial());

    assert!(memberships::find_membership(&db.pool, u1, group.id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn transfer_moves_members_between_groups() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let from = make_group(&db.pool, admin, "Sopranos", false).await?;
    let to = make_group(&db.pool, admin, "Altos", false).await?;
    memberships::assign_membership(&db.pool, admin, user, from.id, None).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    let op = BulkOperation::Transfer { from_group_id: from.id, to_group_id: to.id };
    let result = bulk.apply_to_users(admin, &[user], op, None).await?;
    assert_eq!(result.succeeded, vec![user]);

    assert!(!memberships::find_membership(&db.pool, user, from.id).await?.unwrap().is_active);
    assert!(memberships::find_membership(&db.pool, user, to.id).await?.unwrap().is_active);
    Ok(())
}

#[tokio::test]
async fn failed_assign_after_remove_is_a_partial_transfer() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let from = make_group(&db.pool, admin, "Sopranos", false).await?;
    memberships::assign_membership(&db.pool, admin, user, from.id, None).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    let op = BulkOperation::Transfer { from_group_id: from.id, to_group_id: Uuid::new_v4() };
    let result = bulk.apply_to_users(admin, &[user], op, None).await?;

    assert!(result.succeeded.is_empty());
    assert_eq!(result.failed_ids(), vec![user]);
    assert_eq!(result.failed[0].error, ErrorKind::PartialTransfer);

    // The removal is not rolled back.
    assert!(!memberships::find_membership(&db.pool, user, from.id).await?.unwrap().is_active);
    Ok(())
}

#[tokio::test]
async fn transfer_for_non_member_fails_before_touching_target() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let user = insert_profile(&db.pool, "u@example.com", "member", None).await?;
    let from = make_group(&db.pool, admin, "Sopranos", false).await?;
    let to = make_group(&db.pool, admin, "Altos", false).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    let op = BulkOperation::Transfer { from_group_id: from.id, to_group_id: to.id };
    let result = bulk.apply_to_users(admin, &[user], op, None).await?;

    assert_eq!(result.failed[0].error, ErrorKind::NotFound);
    assert!(memberships::find_membership(&db.pool, user, to.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn batch_writes_per_user_entries_and_one_summary() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let u1 = insert_profile(&db.pool, "u1@example.com", "member", None).await?;
    let u2 = insert_profile(&db.pool, "u2@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    // Duplicates are processed once.
    let result = bulk
        .apply_to_users(admin, &[u1, u2, u1], BulkOperation::Assign { group_id: group.id }, None)
        .await?;
    assert_eq!(result.succeeded, vec![u1, u2]);

    let assigned = audit::query(
        &db.pool,
        &AuditQuery { action_type: Some("membership.assigned".to_string()), ..AuditQuery::default() },
        50,
    )
    .await?;
    assert_eq!(assigned.entries.len(), 2);

    let summaries = audit::query(
        &db.pool,
        &AuditQuery { action_type: Some("bulk.assign".to_string()), ..AuditQuery::default() },
        50,
    )
    .await?;
    assert_eq!(summaries.entries.len(), 1);
    let summary = summaries.entries[0].new_value.as_ref().unwrap();
    assert_eq!(summary["succeeded"].as_array().unwrap().len(), 2);
    assert_eq!(summary["operation"]["type"], "assign");
    Ok(())
}

#[tokio::test]
async fn empty_batch_still_records_a_summary() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    let result = bulk
        .apply_to_users(admin, &[], BulkOperation::Remove { group_id: group.id }, None)
        .await?;
    assert!(result.succeeded.is_empty() && result.failed.is_empty());

    let summaries = audit::query(
        &db.pool,
        &AuditQuery { action_type: Some("bulk.remove".to_string()), ..AuditQuery::default() },
        50,
    )
    .await?;
    assert_eq!(summaries.entries.len(), 1);
    Ok(())
}

#[tokio::test]
async fn heavily_repeated_ids_are_processed_once_in_first_seen_order() -> Result<()> {
    let db = test_db().await?;
    let admin = insert_profile(&db.pool, "admin@example.com", "admin", None).await?;
    let u1 = insert_profile(&db.pool, "u1@example.com", "member", None).await?;
    let u2 = insert_profile(&db.pool, "u2@example.com", "member", None).await?;
    let u3 = insert_profile(&db.pool, "u3@example.com", "member", None).await?;
    let group = make_group(&db.pool, admin, "Tour Manager", false).await?;
    let bulk = BulkOperationCoordinator::new(db.pool.clone());

    let ids: Vec<Uuid> = [u2, u1, u3].iter().copied().cycle().take(3_000).collect();
    let result = bulk
        .apply_to_users(admin, &ids, BulkOperation::Assign { group_id: group.id }, None)
        .await?;

    assert_eq!(result.succeeded, vec![u2, u1, u3]);
    assert!(result.failed.is_empty());
    Ok(())
}
