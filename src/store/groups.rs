//! Permission groups and their function grants.

use serde_json::json;
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, entry_for};
use crate::catalog::FunctionCatalog;
use crate::db::{self, row_parsers::{format_datetime, group_from_row, group_grant_from_row}};
use crate::errors::{AppError, AppResult};
use crate::models::group::{
    GroupCreateRequest, GroupFunctionGrant, GroupGrantRequest, GroupUpdateRequest, PermissionGroup,
    DEFAULT_GROUP_COLOR,
};
use crate::utils::utc_now;

const GROUP_COLUMNS: &str = "id, name, description, color, is_default, is_active, created_at, updated_at";

pub async fn list_groups(pool: &SqlitePool) -> AppResult<Vec<PermissionGroup>> {
    let sql = format!("SELECT {GROUP_COLUMNS} FROM permission_groups ORDER BY is_default DESC, name");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(group_from_row).collect()
}

pub async fn find_group<'e, E>(exec: E, group_id: Uuid) -> AppResult<Option<PermissionGroup>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {GROUP_COLUMNS} FROM permission_groups WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(group_id.to_string())
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(group_from_row).transpose()
}

pub async fn get_group<'e, E>(exec: E, group_id: Uuid) -> AppResult<PermissionGroup>
where
    E: Executor<'e, Database = Sqlite>,
{
    find_group(exec, group_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("group {group_id}")))
}

fn validated_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("group name must not be empty"));
    }
    Ok(name.to_string())
}

pub async fn create_group(
    pool: &SqlitePool,
    actor: Uuid,
    req: GroupCreateRequest,
) -> AppResult<PermissionGroup> {
    let now = utc_now();
    let group = PermissionGroup {
        id: Uuid::new_v4(),
        name: validated_name(&req.name)?,
        description: req.description,
        color: req.color.unwrap_or_else(|| DEFAULT_GROUP_COLOR.to_string()),
        is_default: req.is_default,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let mut tx = db::begin_write(pool).await?;
    sqlx::query(
        "INSERT INTO permission_groups (id, name, description, color, is_default, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(group.id.to_string())
    .bind(&group.name)
    .bind(&group.description)
    .bind(&group.color)
    .bind(group.is_default)
    .bind(group.is_active)
    .bind(format_datetime(now))
    .bind(format_datetime(now))
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_write(e, "group name"))?;

    audit::record(&mut tx, &entry_for("created", actor, None, Some(&group))?).await?;
    tx.commit().await?;

    tracing::info!(group_id = %group.id, name = %group.name, "permission group created");
    Ok(group)
}

pub async fn update_group(
    pool: &SqlitePool,
    actor: Uuid,
    group_id: Uuid,
    req: GroupUpdateRequest,
) -> AppResult<PermissionGroup> {
    let mut tx = db::begin_write(pool).await?;
    let old = get_group(&mut *tx, group_id).await?;

    let mut group = old.clone();
    if let Some(name) = req.name {
        group.name = validated_name(&name)?;
    }
    if let Some(description) = req.description {
        group.description = Some(description);
    }
    if let Some(color) = req.color {
        group.color = color;
    }
    group.updated_at = utc_now();

    sqlx::query("UPDATE permission_groups SET name = ?, description = ?, color = ?, updated_at = ? WHERE id = ?")
        .bind(&group.name)
        .bind(&group.description)
        .bind(&group.color)
        .bind(format_datetime(group.updated_at))
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::from_write(e, "group name"))?;

    audit::record(&mut tx, &entry_for("updated", actor, Some(&old), Some(&group))?).await?;
    tx.commit().await?;

    Ok(group)
}

/// Soft-deactivate a group. Its memberships and grants stay in place but stop
/// contributing to resolution.
pub async fn deactivate_group(pool: &SqlitePool, actor: Uuid, group_id: Uuid) -> AppResult<PermissionGroup> {
    let mut tx = db::begin_write(pool).await?;
    let old = get_group(&mut *tx, group_id).await?;
    if old.is_default {
        return Err(AppError::protected(format!("default group '{}' cannot be deactivated", old.name)));
    }

    let mut group = old.clone();
    group.is_active = false;
    group.updated_at = utc_now();

    sqlx::query("UPDATE permission_groups SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(format_datetime(group.updated_at))
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, &entry_for("deactivated", actor, Some(&old), Some(&group))?).await?;
    tx.commit().await?;

    tracing::info!(%group_id, "permission group deactivated");
    Ok(group)
}

/// Hard-delete a non-default group together with its grants and memberships.
pub async fn delete_group(pool: &SqlitePool, actor: Uuid, group_id: Uuid) -> AppResult<()> {
    let mut tx = db::begin_write(pool).await?;
    let group = get_group(&mut *tx, group_id).await?;
    if group.is_default {
        return Err(AppError::protected(format!("default group '{}' cannot be deleted", group.name)));
    }

    let grants = sqlx::query("DELETE FROM group_function_grants WHERE group_id = ?")
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let memberships = sqlx::query("DELETE FROM user_permission_groups WHERE group_id = ?")
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM permission_groups WHERE id = ?")
        .bind(group_id.to_string())
        .execute(&mut *tx)
        .await?;

    let entry = entry_for("deleted", actor, Some(&group), None)?.notes(
        json!({ "removed_grants": grants, "removed_memberships": memberships }).to_string(),
    );
    audit::record(&mut tx, &entry).await?;
    tx.commit().await?;

    tracing::info!(%group_id, grants, memberships, "permission group deleted");
    Ok(())
}

pub async fn list_group_grants<'e, E>(exec: E, group_id: Uuid) -> AppResult<Vec<GroupFunctionGrant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT group_id, function_id, enabled, level, scope FROM group_function_grants \
         WHERE group_id = ? ORDER BY function_id",
    )
    .bind(group_id.to_string())
    .fetch_all(exec)
    .await?;
    rows.iter().map(group_grant_from_row).collect()
}

async fn find_group_grant<'e, E>(exec: E, group_id: Uuid, function_id: &str) -> AppResult<Option<GroupFunctionGrant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT group_id, function_id, enabled, level, scope FROM group_function_grants \
         WHERE group_id = ? AND function_id = ?",
    )
    .bind(group_id.to_string())
    .bind(function_id)
    .fetch_optional(exec)
    .await?;
    row.as_ref().map(group_grant_from_row).transpose()
}

/// Create or replace the grant of `function_id` on a group. Default groups
/// may be edited here.
pub async fn set_group_grant(
    pool: &SqlitePool,
    catalog: &FunctionCatalog,
    actor: Uuid,
    group_id: Uuid,
    function_id: &str,
    req: GroupGrantRequest,
) -> AppResult<GroupFunctionGrant> {
    catalog.require(function_id)?;

    let mut tx = db::begin_write(pool).await?;
    get_group(&mut *tx, group_id).await?;
    let old = find_group_grant(&mut *tx, group_id, function_id).await?;

    let grant = GroupFunctionGrant {
        group_id,
        function_id: function_id.to_string(),
        enabled: req.enabled,
        level: req.level,
        scope: req.scope,
    };

    sqlx::query(
        "INSERT INTO group_function_grants (group_id, function_id, enabled, level, scope) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT (group_id, function_id) DO UPDATE SET enabled = excluded.enabled, level = excluded.level, scope = excluded.scope",
    )
    .bind(group_id.to_string())
    .bind(function_id)
    .bind(grant.enabled)
    .bind(grant.level.as_str())
    .bind(grant.scope.as_str())
    .execute(&mut *tx)
    .await?;

    let action = if old.is_some() { "updated" } else { "granted" };
    audit::record(&mut tx, &entry_for(action, actor, old.as_ref(), Some(&grant))?).await?;
    tx.commit().await?;

    Ok(grant)
}

pub async fn remove_group_grant(pool: &SqlitePool, actor: Uuid, group_id: Uuid, function_id: &str) -> AppResult<()> {
    let mut tx = db::begin_write(pool).await?;
    let old = find_group_grant(&mut *tx, group_id, function_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("grant of {function_id} on group {group_id}")))?;

    sqlx::query("DELETE FROM group_function_grants WHERE group_id = ? AND function_id = ?")
        .bind(group_id.to_string())
        .bind(function_id)
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, &entry_for("revoked", actor, Some(&old), None)?).await?;
    tx.commit().await?;

    Ok(())
}
