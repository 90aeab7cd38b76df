use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkOperation {
    Assign { group_id: Uuid },
    Remove { group_id: Uuid },
    Transfer { from_group_id: Uuid, to_group_id: Uuid },
}

impl BulkOperation {
    pub fn name(&self) -> &'static str {
        match self {
            BulkOperation::Assign { .. } => "assign",
            BulkOperation::Remove { .. } => "remove",
            BulkOperation::Transfer { .. } => "transfer",
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BulkRequest {
    pub user_ids: Vec<Uuid>,
    pub operation: BulkOperation,
    /// Applied to the memberships created by `assign` and `transfer`.
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkFailure {
    pub user_id: Uuid,
    pub error: ErrorKind,
    pub message: String,
}

/// Partition of a batch into per-user outcomes. Partial success is a normal
/// result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BulkResult {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

impl BulkResult {
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<Uuid> {
        self.failed.iter().map(|f| f.user_id).collect()
    }
}
