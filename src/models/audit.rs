use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Immutable audit log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    /// Insertion sequence; also the paging cursor.
    pub seq: i64,
    #[schema(example = "membership.assigned")]
    pub action_type: String,
    pub target_user_id: Option<Uuid>,
    pub function_id: Option<String>,
    #[schema(value_type = Object)]
    pub old_value: Option<Value>,
    #[schema(value_type = Object)]
    pub new_value: Option<Value>,
    pub performed_by: Uuid,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
    pub prev_hash: Option<String>,
    pub hash: String,
}

/// Payload handed to the recorder. Content is stored as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub action_type: String,
    pub target_user_id: Option<Uuid>,
    pub function_id: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub performed_by: Uuid,
    pub timestamp: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewAuditEntry {
    pub fn new(action_type: impl Into<String>, performed_by: Uuid) -> Self {
        Self {
            action_type: action_type.into(),
            target_user_id: None,
            function_id: None,
            old_value: None,
            new_value: None,
            performed_by,
            timestamp: Utc::now(),
            notes: None,
        }
    }

    pub fn target_user(mut self, user_id: Option<Uuid>) -> Self {
        self.target_user_id = user_id;
        self
    }

    pub fn function(mut self, function_id: Option<&str>) -> Self {
        self.function_id = function_id.map(str::to_string);
        self
    }

    pub fn values(mut self, old: Option<Value>, new: Option<Value>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Filters for the audit view. All bounds are optional; `from` is inclusive
/// and `to` exclusive.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub target_user: Option<Uuid>,
    pub action_type: Option<String>,
    /// Return entries strictly older than this cursor.
    pub before: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    /// Cursor for the next (older) page, absent on the last page.
    pub next_before: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChainReport {
    pub checked: u64,
    pub valid: bool,
    /// Sequence number of the first entry whose hash does not verify.
    pub broken_at: Option<i64>,
}
