use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::db::row_parsers::{audit_row_from_row, AuditRow};
use crate::errors::AppResult;
use crate::models::audit::ChainReport;

#[derive(Serialize)]
struct HashedFields<'a> {
    id: &'a str,
    action_type: &'a str,
    target_user_id: Option<&'a str>,
    function_id: Option<&'a str>,
    old_value: Option<&'a str>,
    new_value: Option<&'a str>,
    performed_by: &'a str,
    occurred_at: &'a str,
    notes: Option<&'a str>,
}

/// SHA256(prev_hash || canonical fields), hex encoded. `seq` and `hash` are
/// not part of the input.
pub(crate) fn hash_row(row: &AuditRow) -> String {
    let fields = HashedFields {
        id: &row.id,
        action_type: &row.action_type,
        target_user_id: row.target_user_id.as_deref(),
        function_id: row.function_id.as_deref(),
        old_value: row.old_value.as_deref(),
        new_value: row.new_value.as_deref(),
        performed_by: &row.performed_by,
        occurred_at: &row.occurred_at,
        notes: row.notes.as_deref(),
    };
    let payload = serde_json::to_string(&fields).unwrap_or_default();

    let mut hasher = Sha256::new();
    if let Some(prev) = &row.prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Walk the log oldest-first and report the first entry whose link or hash
/// does not verify.
pub async fn verify_chain(pool: &SqlitePool) -> AppResult<ChainReport> {
    let rows = sqlx::query(
        "SELECT seq, id, action_type, target_user_id, function_id, old_value, new_value, \
         performed_by, occurred_at, notes, prev_hash, hash FROM audit_log ORDER BY seq ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut checked = 0u64;
    let mut expected_prev: Option<String> = None;

    for row in &rows {
        let row = audit_row_from_row(row)?;
        checked += 1;

        if row.prev_hash != expected_prev || hash_row(&row) != row.hash {
            tracing::warn!(seq = row.seq, "audit chain broken");
            return Ok(ChainReport {
                checked,
                valid: false,
                broken_at: Some(row.seq),
            });
        }
        expected_prev = Some(row.hash);
    }

    Ok(ChainReport {
        checked,
        valid: true,
        broken_at: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(prev: Option<&str>) -> AuditRow {
        AuditRow {
            seq: 1,
            id: "6f1c1e1a-0000-4000-8000-000000000001".to_string(),
            action_type: "group.created".to_string(),
            target_user_id: None,
            function_id: None,
            old_value: None,
            new_value: Some(r#"{"name":"Tour Manager"}"#.to_string()),
            performed_by: "6f1c1e1a-0000-4000-8000-000000000002".to_string(),
            occurred_at: "2025-01-01T00:00:00.000000Z".to_string(),
            notes: None,
            prev_hash: prev.map(str::to_string),
            hash: String::new(),
        }
    }

    #[test]
    fn hash_depends_on_predecessor_and_content() {
        let first = hash_row(&row(None));
        assert_eq!(first.len(), 64);
        assert_ne!(first, hash_row(&row(Some(&first))));

        let mut edited = row(None);
        edited.new_value = Some(r#"{"name":"Road Manager"}"#.to_string());
        assert_ne!(first, hash_row(&edited));

        let mut resequenced = row(None);
        resequenced.seq = 99;
        assert_eq!(first, hash_row(&resequenced));
    }
}
