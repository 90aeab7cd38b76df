//! Executive-board position matrix.

use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, entry_for};
use crate::catalog::FunctionCatalog;
use crate::db::{self, row_parsers::position_grant_from_row};
use crate::errors::{AppError, AppResult};
use crate::models::position::{PositionFunctionGrant, PositionGrantRequest};
use crate::models::profile::ExecPosition;

pub async fn list_position_grants<'e, E>(exec: E, position: ExecPosition) -> AppResult<Vec<PositionFunctionGrant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT position, function_id, can_access, can_manage FROM executive_position_functions \
         WHERE position = ? ORDER BY function_id",
    )
    .bind(position.as_str())
    .fetch_all(exec)
    .await?;

    let mut grants = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(grant) = position_grant_from_row(row)? {
            grants.push(grant);
        }
    }
    Ok(grants)
}

async fn find_position_grant<'e, E>(
    exec: E,
    position: ExecPosition,
    function_id: &str,
) -> AppResult<Option<PositionFunctionGrant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT position, function_id, can_access, can_manage FROM executive_position_functions \
         WHERE position = ? AND function_id = ?",
    )
    .bind(position.as_str())
    .bind(function_id)
    .fetch_optional(exec)
    .await?;

    match row {
        Some(row) => position_grant_from_row(&row),
        None => Ok(None),
    }
}

pub async fn set_position_grant(
    pool: &SqlitePool,
    catalog: &FunctionCatalog,
    actor: Uuid,
    position: ExecPosition,
    function_id: &str,
    req: PositionGrantRequest,
) -> AppResult<PositionFunctionGrant> {
    catalog.require(function_id)?;

    let grant = PositionFunctionGrant {
        position,
        function_id: function_id.to_string(),
        can_access: req.can_access,
        can_manage: req.can_manage,
    };

    let mut tx = db::begin_write(pool).await?;
    let old = find_position_grant(&mut *tx, position, function_id).await?;

    sqlx::query(
        "INSERT INTO executive_position_functions (position, function_id, can_access, can_manage) VALUES (?, ?, ?, ?) \
         ON CONFLICT (position, function_id) DO UPDATE SET can_access = excluded.can_access, can_manage = excluded.can_manage",
    )
    .bind(position.as_str())
    .bind(function_id)
    .bind(grant.can_access)
    .bind(grant.can_manage)
    .execute(&mut *tx)
    .await?;

    let action = if old.is_some() { "updated" } else { "granted" };
    audit::record(&mut tx, &entry_for(action, actor, old.as_ref(), Some(&grant))?).await?;
    tx.commit().await?;

    tracing::info!(position = position.as_str(), function_id, action, "position grant written");
    Ok(grant)
}

pub async fn remove_position_grant(
    pool: &SqlitePool,
    actor: Uuid,
    position: ExecPosition,
    function_id: &str,
) -> AppResult<()> {
    let mut tx = db::begin_write(pool).await?;
    let old = find_position_grant(&mut *tx, position, function_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} grant for {}", position.as_str(), function_id)))?;

    sqlx::query("DELETE FROM executive_position_functions WHERE position = ? AND function_id = ?")
        .bind(position.as_str())
        .bind(function_id)
        .execute(&mut *tx)
        .await?;

    audit::record(&mut tx, &entry_for("revoked", actor, Some(&old), None)?).await?;
    tx.commit().await?;

    Ok(())
}
