//! Audit recorder
//!
//! Append-only log of permission-affecting mutations. Entries are written on
//! the caller's connection so they commit (or roll back) together with the
//! mutation they describe. Each entry is chained to its predecessor with a
//! SHA-256 hash; [`verify_chain`] detects edits made behind the core's back.

mod chain;

pub use chain::verify_chain;

use serde::Serialize;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::db::row_parsers::{self, audit_row_from_row, format_datetime, AuditRow};
use crate::errors::{AppError, AppResult};
use crate::models::audit::{AuditEntry, AuditPage, AuditQuery, NewAuditEntry};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 500;

/// Records that can appear as old/new values in the audit log.
pub trait Auditable: Serialize + Send + Sync {
    /// Prefix of the action type, e.g. "membership" in "membership.assigned".
    fn entity_type() -> &'static str;

    fn target_user(&self) -> Option<Uuid> {
        None
    }

    fn function_id(&self) -> Option<&str> {
        None
    }
}

/// Build an entry describing a change from `old` to `new` on one entity.
///
/// Fails if either value cannot be serialised; an entry never records a
/// placeholder in place of the real change.
pub fn entry_for<T: Auditable>(
    action: &str,
    performed_by: Uuid,
    old: Option<&T>,
    new: Option<&T>,
) -> AppResult<NewAuditEntry> {
    let subject = new.or(old);
    let old_value = old.map(audit_value).transpose()?;
    let new_value = new.map(audit_value).transpose()?;

    Ok(NewAuditEntry::new(format!("{}.{}", T::entity_type(), action), performed_by)
        .target_user(subject.and_then(|s| s.target_user()))
        .function(subject.and_then(|s| s.function_id()))
        .values(old_value, new_value))
}

fn audit_value<T: Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::internal(format!("failed to serialise audit value: {e}")))
}

/// Append one entry. Only storage failures are reported; the payload itself
/// is never validated.
pub async fn record(conn: &mut SqliteConnection, entry: &NewAuditEntry) -> AppResult<AuditEntry> {
    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM audit_log ORDER BY seq DESC LIMIT 1")
            .fetch_optional(&mut *conn)
            .await?;

    let row = AuditRow {
        seq: 0,
        id: Uuid::new_v4().to_string(),
        action_type: entry.action_type.clone(),
        target_user_id: entry.target_user_id.map(|u| u.to_string()),
        function_id: entry.function_id.clone(),
        old_value: entry.old_value.as_ref().map(Value::to_string),
        new_value: entry.new_value.as_ref().map(Value::to_string),
        performed_by: entry.performed_by.to_string(),
        occurred_at: format_datetime(entry.timestamp),
        notes: entry.notes.clone(),
        hash: String::new(),
        prev_hash,
    };
    let hash = chain::hash_row(&row);

    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO audit_log (id, action_type, target_user_id, function_id, old_value, new_value,
                               performed_by, occurred_at, occurred_at_ms, notes, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING seq
        "#,
    )
    .bind(&row.id)
    .bind(&row.action_type)
    .bind(&row.target_user_id)
    .bind(&row.function_id)
    .bind(&row.old_value)
    .bind(&row.new_value)
    .bind(&row.performed_by)
    .bind(&row.occurred_at)
    .bind(entry.timestamp.timestamp_millis())
    .bind(&row.notes)
    .bind(&row.prev_hash)
    .bind(&hash)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        seq,
        action_type = %row.action_type,
        performed_by = %row.performed_by,
        "audit entry recorded"
    );

    entry_from_row(AuditRow { seq, hash, ..row })
}

/// Newest-first page of entries matching `filter`.
pub async fn query(pool: &SqlitePool, filter: &AuditQuery, default_limit: u32) -> AppResult<AuditPage> {
    let limit = filter
        .limit
        .unwrap_or(default_limit)
        .clamp(1, MAX_PAGE_SIZE);

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT seq, id, action_type, target_user_id, function_id, old_value, new_value, \
         performed_by, occurred_at, notes, prev_hash, hash FROM audit_log WHERE 1 = 1",
    );
    if let Some(from) = filter.from {
        qb.push(" AND occurred_at_ms >= ").push_bind(from.timestamp_millis());
    }
    if let Some(to) = filter.to {
        qb.push(" AND occurred_at_ms < ").push_bind(to.timestamp_millis());
    }
    if let Some(user) = filter.target_user {
        qb.push(" AND target_user_id = ").push_bind(user.to_string());
    }
    if let Some(action_type) = &filter.action_type {
        qb.push(" AND action_type = ").push_bind(action_type.clone());
    }
    if let Some(before) = filter.before {
        qb.push(" AND seq < ").push_bind(before);
    }
    qb.push(" ORDER BY seq DESC LIMIT ").push_bind(i64::from(limit) + 1);

    let rows = qb.build().fetch_all(pool).await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        entries.push(entry_from_row(audit_row_from_row(row)?)?);
    }

    let next_before = if entries.len() > limit as usize {
        entries.truncate(limit as usize);
        entries.last().map(|e| e.seq)
    } else {
        None
    };

    Ok(AuditPage { entries, next_before })
}

/// Lazy, page-at-a-time walk over a filtered audit view.
pub struct AuditPager<'a> {
    pool: &'a SqlitePool,
    filter: AuditQuery,
    page_size: u32,
    exhausted: bool,
}

impl<'a> AuditPager<'a> {
    pub fn new(pool: &'a SqlitePool, filter: AuditQuery, page_size: u32) -> Self {
        Self {
            pool,
            filter,
            page_size,
            exhausted: false,
        }
    }

    /// `None` once every matching entry has been returned.
    pub async fn next_page(&mut self) -> AppResult<Option<Vec<AuditEntry>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = query(self.pool, &self.filter, self.page_size).await?;
        match page.next_before {
            Some(cursor) => self.filter.before = Some(cursor),
            None => self.exhausted = true,
        }

        if page.entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(page.entries))
    }
}

fn parse_json(raw: Option<&str>) -> Option<Value> {
    // Stored values are written by `record`; anything unparseable is kept as a string.
    raw.map(|s| serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())))
}

fn entry_from_row(row: AuditRow) -> AppResult<AuditEntry> {
    Ok(AuditEntry {
        id: row_parsers::parse_uuid(&row.id)?,
        seq: row.seq,
        target_user_id: row
            .target_user_id
            .as_deref()
            .map(row_parsers::parse_uuid)
            .transpose()?,
        old_value: parse_json(row.old_value.as_deref()),
        new_value: parse_json(row.new_value.as_deref()),
        performed_by: row_parsers::parse_uuid(&row.performed_by)
            .map_err(|_| AppError::internal(format!("invalid performed_by on audit entry {}", row.seq)))?,
        timestamp: row_parsers::parse_datetime(&row.occurred_at)?,
        action_type: row.action_type,
        function_id: row.function_id,
        notes: row.notes,
        prev_hash: row.prev_hash,
        hash: row.hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Tagged {
        // Non-string map keys have no JSON representation.
        labels: BTreeMap<Vec<u8>, u8>,
    }

    impl Auditable for Tagged {
        fn entity_type() -> &'static str {
            "tagged"
        }
    }

    #[test]
    fn entry_for_carries_both_values() {
        let old = Tagged { labels: BTreeMap::new() };
        let entry = entry_for("updated", Uuid::new_v4(), Some(&old), None).unwrap();
        assert_eq!(entry.action_type, "tagged.updated");
        assert_eq!(entry.old_value, Some(serde_json::json!({ "labels": {} })));
        assert!(entry.new_value.is_none());
    }

    #[test]
    fn unserialisable_value_is_an_error_not_null() {
        let new = Tagged { labels: BTreeMap::from([(vec![1, 2], 3)]) };
        let err = entry_for("created", Uuid::new_v4(), None, Some(&new)).unwrap_err();
        assert!(matches!(err, AppError::Internal(_)), "got {err:?}");
    }
}
