#![allow(dead_code)]

use std::path::Path;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use member_authz::app::{create_app_with_state, AppState};
use member_authz::authz::AuthzMode;
use member_authz::catalog::FunctionCatalog;
use member_authz::jwt::JwtConfig;
use member_authz::models::group::{GroupCreateRequest, GroupGrantRequest, GrantLevel, GrantScope, PermissionGroup};
use member_authz::store::groups;

pub const TEST_SECRET: &str = "test-secret";

/// Migrated SQLite database in a temp dir. Keep it alive for the whole test.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn test_db() -> Result<TestDb> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    Ok(TestDb { pool, _dir: dir })
}

pub async fn insert_profile(pool: &SqlitePool, email: &str, role: &str, position: Option<&str>) -> Result<Uuid> {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (user_id, email, role, is_exec_board, exec_board_role) VALUES (?, ?, ?, ?, ?)")
        .bind(user_id.to_string())
        .bind(email)
        .bind(role)
        .bind(position.is_some())
        .bind(position)
        .execute(pool)
        .await?;
    Ok(user_id)
}

pub async fn audit_count(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM audit_log").fetch_one(pool).await?)
}

pub async fn make_group(pool: &SqlitePool, actor: Uuid, name: &str, is_default: bool) -> Result<PermissionGroup> {
    let req = GroupCreateRequest {
        name: name.to_string(),
        description: None,
        color: None,
        is_default,
    };
    Ok(groups::create_group(pool, actor, req).await?)
}

pub fn grant(level: GrantLevel) -> GroupGrantRequest {
    GroupGrantRequest {
        enabled: true,
        level,
        scope: GrantScope::Own,
    }
}

pub fn test_app(pool: &SqlitePool, mode: AuthzMode) -> Router {
    let state = AppState::new(
        pool.clone(),
        JwtConfig::new(TEST_SECRET, 1),
        FunctionCatalog::builtin(),
        mode,
    );
    create_app_with_state(state)
}

pub fn token_for(user_id: Uuid) -> Result<String> {
    Ok(JwtConfig::new(TEST_SECRET, 1).issue(user_id)?)
}
