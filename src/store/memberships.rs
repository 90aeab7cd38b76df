//! User-to-group assignments.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, entry_for};
use crate::db::{self, row_parsers::{format_datetime, format_opt_datetime, membership_from_row}};
use crate::errors::{AppError, AppResult};
use crate::models::group::GroupMembership;
use crate::store::{groups, profiles};
use crate::utils::utc_now;

const MEMBERSHIP_COLUMNS: &str = "user_id, group_id, is_active, expires_at, assigned_by, assigned_at";

pub async fn list_user_memberships<'e, E>(exec: E, user_id: Uuid) -> AppResult<Vec<GroupMembership>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM user_permission_groups WHERE user_id = ? ORDER BY assigned_at");
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_all(exec)
        .await?;
    rows.iter().map(membership_from_row).collect()
}

pub async fn list_group_members(pool: &SqlitePool, group_id: Uuid) -> AppResult<Vec<GroupMembership>> {
    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM user_permission_groups WHERE group_id = ? ORDER BY assigned_at");
    let rows = sqlx::query(&sql)
        .bind(group_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(membership_from_row).collect()
}

pub async fn find_membership<'e, E>(exec: E, user_id: Uuid, group_id: Uuid) -> AppResult<Option<GroupMembership>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {MEMBERSHIP_COLUMNS} FROM user_permission_groups WHERE user_id = ? AND group_id = ?");
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(group_id.to_string())
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(membership_from_row).transpose()
}

/// Assign `user_id` to `group_id`. Re-assigning updates the existing row
/// (reactivating it and replacing the expiry); there is never more than one
/// row per pair. An `expires_at` in the past is stored as given.
pub async fn assign_membership(
    pool: &SqlitePool,
    actor: Uuid,
    user_id: Uuid,
    group_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
) -> AppResult<GroupMembership> {
    let now = utc_now();
    let mut tx = db::begin_write(pool).await?;
    profiles::get_profile(&mut *tx, user_id).await?;
    groups::get_group(&mut *tx, group_id).await?;
    let old = find_membership(&mut *tx, user_id, group_id).await?;

    if matches!(expires_at, Some(at) if at <= now) {
        tracing::info!(%user_id, %group_id, "membership assigned with an expiry in the past");
    }

    let membership = GroupMembership {
        user_id,
        group_id,
        is_active: true,
        expires_at,
        assigned_by: Some(actor),
        assigned_at: now,
    };

    sqlx::query(
        "INSERT INTO user_permission_groups (user_id, group_id, is_active, expires_at, assigned_by, assigned_at) \
         VALUES (?, ?, 1, ?, ?, ?) \
         ON CONFLICT (user_id, group_id) DO UPDATE SET is_active = 1, expires_at = excluded.expires_at, \
         assigned_by = excluded.assigned_by, assigned_at = excluded.assigned_at",
    )
    .bind(user_id.to_string())
    .bind(group_id.to_string())
    .bind(format_opt_datetime(expires_at))
    .bind(actor.to_string())
    .bind(format_datetime(now))
    .execute(&mut *tx)
    .await?;

    let action = if old.is_some() { "updated" } else { "assigned" };
    audit::record(&mut tx, &entry_for(action, actor, old.as_ref(), Some(&membership))?).await?;
    tx.commit().await?;

    tracing::info!(%user_id, %group_id, action, "group membership written");
    Ok(membership)
}

/// Deactivate an active membership. Fails with `NotFound` when the user is
/// not an active member of the group.
pub async fn remove_membership(
    pool: &SqlitePool,
    actor: Uuid,
    user_id: Uuid,
    group_id: Uuid,
) -> AppResult<GroupMembership> {
    let mut tx = db::begin_write(pool).await?;
    let old = find_membership(&mut *tx, user_id, group_id)
        .await?
        .filter(|m| m.is_active)
        .ok_or_else(|| AppError::not_found(format!("membership of user {user_id} in group {group_id}")))?;

    let mut membership = old.clone();
    membership.is_active = false;

    sqlx::query("UPDATE user_permission_groups SET is_active = 0 WHERE user_id = ? AND group_id = ?")
        .bind(user_id.to_string())
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, &entry_for("removed", actor, Some(&old), Some(&membership))?).await?;
    tx.commit().await?;

    tracing::info!(%user_id, %group_id, "group membership removed");
    Ok(membership)
}
