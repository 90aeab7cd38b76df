use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::errors::AppResult;
use crate::utils::utc_now;

pub mod row_parsers;

pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

	let options = SqliteConnectOptions::from_str(&database_url)
		.context("invalid DATABASE_URL")?
		.create_if_missing(true)
		.foreign_keys(true)
		.busy_timeout(Duration::from_secs(10));

	let pool = SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect_with(options)
		.await
		.context("failed to connect to database")?;

	sqlx::migrate!()
		.run(&pool)
		.await
		.context("failed to run migrations")?;

	Ok(pool)
}

/// Open a transaction that holds the database write lock from its first
/// statement.
///
/// SQLite cannot upgrade a read lock while another writer is active: a
/// deferred transaction that reads before it writes fails with SQLITE_BUSY
/// instead of waiting. Touching the `write_lock` row first requests the lock
/// before any read, so concurrent writers queue on the busy timeout.
pub async fn begin_write(pool: &SqlitePool) -> AppResult<Transaction<'static, Sqlite>> {
	let mut tx = pool.begin().await?;
	sqlx::query("UPDATE write_lock SET acquired_at = ? WHERE id = 1")
		.bind(row_parsers::format_datetime(utc_now()))
		.execute(&mut *tx)
		.await?;
	Ok(tx)
}
