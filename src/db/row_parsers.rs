use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::group::{GrantLevel, GrantScope, GroupFunctionGrant, GroupMembership, PermissionGroup};
use crate::models::individual::IndividualOverride;
use crate::models::position::PositionFunctionGrant;
use crate::models::profile::{ExecPosition, Profile, Role};

/// Timestamps are stored as fixed-width RFC3339 text so they sort lexically.
pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn format_opt_datetime(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(format_datetime)
}

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // Try RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS" (optional fraction)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, AppError> {
    match s {
        Some(s) if !s.trim().is_empty() => Ok(Some(parse_datetime(&s)?)),
        _ => Ok(None),
    }
}

fn get<'r, T>(row: &'r SqliteRow, col: &str) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(col)
        .map_err(|e| AppError::internal(format!("missing {}: {}", col, e)))
}

pub fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s.trim()).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

fn uuid_col(row: &SqliteRow, col: &str) -> Result<Uuid, AppError> {
    let s: String = get(row, col)?;
    parse_uuid(&s)
}

fn opt_uuid_col(row: &SqliteRow, col: &str) -> Result<Option<Uuid>, AppError> {
    let s: Option<String> = get(row, col)?;
    s.as_deref().map(parse_uuid).transpose()
}

pub fn profile_from_row(row: &SqliteRow) -> Result<Profile, AppError> {
    let role_s: String = get(row, "role")?;
    let position_s: Option<String> = get(row, "exec_board_role")?;

    Ok(Profile {
        user_id: uuid_col(row, "user_id")?,
        email: get(row, "email")?,
        role: Role::from_db(&role_s),
        is_exec_board: get(row, "is_exec_board")?,
        exec_board_position: position_s.as_deref().and_then(ExecPosition::from_db),
    })
}

pub fn group_from_row(row: &SqliteRow) -> Result<PermissionGroup, AppError> {
    let created_at_s: String = get(row, "created_at")?;
    let updated_at_s: String = get(row, "updated_at")?;

    Ok(PermissionGroup {
        id: uuid_col(row, "id")?,
        name: get(row, "name")?,
        description: get(row, "description")?,
        color: get(row, "color")?,
        is_default: get(row, "is_default")?,
        is_active: get(row, "is_active")?,
        created_at: parse_datetime(&created_at_s)?,
        updated_at: parse_datetime(&updated_at_s)?,
    })
}

pub fn group_grant_from_row(row: &SqliteRow) -> Result<GroupFunctionGrant, AppError> {
    let level_s: String = get(row, "level")?;
    let scope_s: String = get(row, "scope")?;

    Ok(GroupFunctionGrant {
        group_id: uuid_col(row, "group_id")?,
        function_id: get(row, "function_id")?,
        enabled: get(row, "enabled")?,
        level: GrantLevel::from_db(&level_s)
            .ok_or_else(|| AppError::internal(format!("invalid grant level: {}", level_s)))?,
        scope: GrantScope::from_db(&scope_s)
            .ok_or_else(|| AppError::internal(format!("invalid grant scope: {}", scope_s)))?,
    })
}

pub fn membership_from_row(row: &SqliteRow) -> Result<GroupMembership, AppError> {
    let expires_at_s: Option<String> = get(row, "expires_at")?;
    let assigned_at_s: String = get(row, "assigned_at")?;

    Ok(GroupMembership {
        user_id: uuid_col(row, "user_id")?,
        group_id: uuid_col(row, "group_id")?,
        is_active: get(row, "is_active")?,
        expires_at: parse_opt_datetime(expires_at_s)?,
        assigned_by: opt_uuid_col(row, "assigned_by")?,
        assigned_at: parse_datetime(&assigned_at_s)?,
    })
}

pub fn override_from_row(row: &SqliteRow) -> Result<IndividualOverride, AppError> {
    let expires_at_s: Option<String> = get(row, "expires_at")?;
    let granted_at_s: String = get(row, "granted_at")?;

    Ok(IndividualOverride {
        user_email: get(row, "user_email")?,
        module_name: get(row, "module_name")?,
        is_active: get(row, "is_active")?,
        expires_at: parse_opt_datetime(expires_at_s)?,
        granted_by: opt_uuid_col(row, "granted_by")?,
        granted_at: parse_datetime(&granted_at_s)?,
        notes: get(row, "notes")?,
    })
}

pub fn position_grant_from_row(row: &SqliteRow) -> Result<Option<PositionFunctionGrant>, AppError> {
    let position_s: String = get(row, "position")?;
    let Some(position) = ExecPosition::from_db(&position_s) else {
        tracing::warn!(position = %position_s, "skipping matrix row for unknown position");
        return Ok(None);
    };

    Ok(Some(PositionFunctionGrant {
        position,
        function_id: get(row, "function_id")?,
        can_access: get(row, "can_access")?,
        can_manage: get(row, "can_manage")?,
    }))
}

/// Raw audit row as stored; hashing works on these exact strings.
#[derive(Debug, Clone)]
pub struct AuditRow {
    pub seq: i64,
    pub id: String,
    pub action_type: String,
    pub target_user_id: Option<String>,
    pub function_id: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: String,
    pub occurred_at: String,
    pub notes: Option<String>,
    pub prev_hash: Option<String>,
    pub hash: String,
}

pub fn audit_row_from_row(row: &SqliteRow) -> Result<AuditRow, AppError> {
    Ok(AuditRow {
        seq: get(row, "seq")?,
        id: get(row, "id")?,
        action_type: get(row, "action_type")?,
        target_user_id: get(row, "target_user_id")?,
        function_id: get(row, "function_id")?,
        old_value: get(row, "old_value")?,
        new_value: get(row, "new_value")?,
        performed_by: get(row, "performed_by")?,
        occurred_at: get(row, "occurred_at")?,
        notes: get(row, "notes")?,
        prev_hash: get(row, "prev_hash")?,
        hash: get(row, "hash")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_datetimes_parse_back_exactly() {
        let now = Utc::now();
        let text = format_datetime(now);
        let parsed = parse_datetime(&text).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
        assert!(text.ends_with('Z'));
    }

    #[test]
    fn sqlite_default_timestamps_parse() {
        let parsed = parse_datetime("2025-01-02 03:04:05").unwrap();
        assert_eq!(format_datetime(parsed), "2025-01-02T03:04:05.000000Z");
    }

    #[test]
    fn blank_optional_datetime_is_none() {
        assert_eq!(parse_opt_datetime(Some("  ".to_string())).unwrap(), None);
        assert_eq!(parse_opt_datetime(None).unwrap(), None);
    }
}
