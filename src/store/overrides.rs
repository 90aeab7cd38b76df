//! Individual overrides (`username_permissions`).
//!
//! Rows are keyed by e-mail rather than user id so they can be granted before
//! the account exists. A user who changes e-mail loses their overrides.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, entry_for};
use crate::catalog::FunctionCatalog;
use crate::db::{self, row_parsers::{format_datetime, format_opt_datetime, override_from_row}};
use crate::errors::{AppError, AppResult};
use crate::models::individual::{GrantOverrideRequest, IndividualOverride};
use crate::store::profiles;
use crate::utils::{is_unexpired, normalize_email, normalize_module, utc_now};

const OVERRIDE_COLUMNS: &str = "user_email, module_name, is_active, expires_at, granted_by, granted_at, notes";

pub async fn list_overrides(pool: &SqlitePool, email: Option<&str>) -> AppResult<Vec<IndividualOverride>> {
    let rows = match email {
        Some(email) => {
            let sql = format!("SELECT {OVERRIDE_COLUMNS} FROM username_permissions WHERE user_email = ? ORDER BY module_name");
            sqlx::query(&sql).bind(normalize_email(email)).fetch_all(pool).await?
        }
        None => {
            let sql = format!("SELECT {OVERRIDE_COLUMNS} FROM username_permissions ORDER BY user_email, module_name");
            sqlx::query(&sql).fetch_all(pool).await?
        }
    };
    rows.iter().map(override_from_row).collect()
}

pub async fn overrides_for_email<'e, E>(exec: E, email: &str) -> AppResult<Vec<IndividualOverride>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {OVERRIDE_COLUMNS} FROM username_permissions WHERE user_email = ?");
    let rows = sqlx::query(&sql)
        .bind(normalize_email(email))
        .fetch_all(exec)
        .await?;
    rows.iter().map(override_from_row).collect()
}

async fn find_override<'e, E>(exec: E, email: &str, module: &str) -> AppResult<Option<IndividualOverride>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {OVERRIDE_COLUMNS} FROM username_permissions WHERE user_email = ? AND module_name = ?");
    let row = sqlx::query(&sql)
        .bind(email)
        .bind(module)
        .fetch_optional(exec)
        .await?;
    row.as_ref().map(override_from_row).transpose()
}

/// Grant (or re-grant) module access to an e-mail address. The module must
/// be one the catalog uses; it is stored in the catalog's spelling.
pub async fn grant_override(
    pool: &SqlitePool,
    catalog: &FunctionCatalog,
    actor: Uuid,
    req: GrantOverrideRequest,
) -> AppResult<IndividualOverride> {
    let email = normalize_email(&req.user_email);
    let module = normalize_module(&req.module_name);
    if email.is_empty() || module.is_empty() {
        return Err(AppError::bad_request("user_email and module_name are required"));
    }
    let module = catalog
        .module(&module)
        .ok_or_else(|| AppError::bad_request(format!("unknown module: {module}")))?
        .to_string();

    let mut tx = db::begin_write(pool).await?;
    let target = profiles::find_profile_by_email(&mut *tx, &email).await?.map(|p| p.user_id);
    let old = find_override(&mut *tx, &email, &module).await?;
    let grant = pending_grant(actor, &email, &module, req.expires_at, req.notes);
    let grant = write_override(&mut tx, actor, grant, old, target).await?;
    tx.commit().await?;

    Ok(grant)
}

/// Grant access to every module of `category` that the address does not
/// already hold an active, unexpired override for. One audit entry is written
/// per new override; the whole category commits together.
pub async fn grant_category_overrides(
    pool: &SqlitePool,
    catalog: &FunctionCatalog,
    actor: Uuid,
    email: &str,
    category: &str,
    expires_at: Option<DateTime<Utc>>,
) -> AppResult<Vec<IndividualOverride>> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::bad_request("user_email is required"));
    }
    let modules = catalog.modules_in_category(category.trim());
    if modules.is_empty() {
        return Err(AppError::not_found(format!("category {category}")));
    }

    let now = utc_now();
    let mut tx = db::begin_write(pool).await?;
    let target = profiles::find_profile_by_email(&mut *tx, &email).await?.map(|p| p.user_id);

    let mut granted = Vec::new();
    for module in modules {
        let old = find_override(&mut *tx, &email, module).await?;
        if matches!(&old, Some(o) if o.is_active && is_unexpired(o.expires_at, now)) {
            continue;
        }
        let notes = Some(format!("granted with category {category}"));
        let grant = pending_grant(actor, &email, module, expires_at, notes);
        granted.push(write_override(&mut tx, actor, grant, old, target).await?);
    }
    tx.commit().await?;

    tracing::info!(%email, category, granted = granted.len(), "category overrides granted");
    Ok(granted)
}

fn pending_grant(
    actor: Uuid,
    email: &str,
    module: &str,
    expires_at: Option<DateTime<Utc>>,
    notes: Option<String>,
) -> IndividualOverride {
    IndividualOverride {
        user_email: email.to_string(),
        module_name: module.to_string(),
        is_active: true,
        expires_at,
        granted_by: Some(actor),
        granted_at: utc_now(),
        notes,
    }
}

/// Upsert `grant` and record it against `old`, on the caller's transaction.
async fn write_override(
    conn: &mut SqliteConnection,
    actor: Uuid,
    grant: IndividualOverride,
    old: Option<IndividualOverride>,
    target: Option<Uuid>,
) -> AppResult<IndividualOverride> {
    sqlx::query(
        "INSERT INTO username_permissions (user_email, module_name, is_active, expires_at, granted_by, granted_at, notes) \
         VALUES (?, ?, 1, ?, ?, ?, ?) \
         ON CONFLICT (user_email, module_name) DO UPDATE SET is_active = 1, expires_at = excluded.expires_at, \
         granted_by = excluded.granted_by, granted_at = excluded.granted_at, notes = excluded.notes",
    )
    .bind(&grant.user_email)
    .bind(&grant.module_name)
    .bind(format_opt_datetime(grant.expires_at))
    .bind(actor.to_string())
    .bind(format_datetime(grant.granted_at))
    .bind(&grant.notes)
    .execute(&mut *conn)
    .await?;

    let action = if old.is_some() { "updated" } else { "granted" };
    let entry = entry_for(action, actor, old.as_ref(), Some(&grant))?.target_user(target);
    audit::record(conn, &entry).await?;

    tracing::info!(email = %grant.user_email, module = %grant.module_name, action, "individual override written");
    Ok(grant)
}

/// Deactivate an active override.
pub async fn revoke_override(
    pool: &SqlitePool,
    catalog: &FunctionCatalog,
    actor: Uuid,
    email: &str,
    module: &str,
) -> AppResult<IndividualOverride> {
    let email = normalize_email(email);
    let module = normalize_module(module);
    // Rows for modules since dropped from the catalog stay revocable.
    let module = catalog.module(&module).map(str::to_string).unwrap_or(module);

    let mut tx = db::begin_write(pool).await?;
    let old = find_override(&mut *tx, &email, &module)
        .await?
        .filter(|o| o.is_active)
        .ok_or_else(|| AppError::not_found(format!("override of {module} for {email}")))?;
    let target = profiles::find_profile_by_email(&mut *tx, &email).await?;

    let mut grant = old.clone();
    grant.is_active = false;

    sqlx::query("UPDATE username_permissions SET is_active = 0 WHERE user_email = ? AND module_name = ?")
        .bind(&email)
        .bind(&module)
        .execute(&mut *tx)
        .await?;

    let entry = entry_for("revoked", actor, Some(&old), Some(&grant))?
        .target_user(target.map(|p| p.user_id));
    audit::record(&mut tx, &entry).await?;
    tx.commit().await?;

    Ok(grant)
}
