//! Bulk membership operations.
//!
//! Each user is processed with the single-user membership operations, in its
//! own transaction. A failing user never aborts the batch. There is no
//! cross-user or cross-step atomicity: a transfer whose assign step fails
//! after the remove step committed is reported as `PartialTransfer` and the
//! removal stays in place.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::audit;
use crate::db;
use crate::errors::{AppError, AppResult, ErrorKind};
use crate::models::audit::NewAuditEntry;
use crate::models::bulk::{BulkFailure, BulkOperation, BulkResult};
use crate::store::memberships;

#[derive(Debug, Clone)]
pub struct BulkOperationCoordinator {
    pool: SqlitePool,
}

impl BulkOperationCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply `operation` to every user in `user_ids`. Duplicate ids are
    /// processed once, in first-seen order.
    ///
    /// Only a failure to write the batch summary is returned as `Err`; every
    /// per-user failure lands in [`BulkResult::failed`].
    pub async fn apply_to_users(
        &self,
        actor: Uuid,
        user_ids: &[Uuid],
        operation: BulkOperation,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<BulkResult> {
        let mut result = BulkResult::default();
        let mut seen = HashSet::with_capacity(user_ids.len());

        for &user_id in user_ids {
            if !seen.insert(user_id) {
                continue;
            }

            match self.apply_one(actor, user_id, operation, expires_at).await {
                Ok(()) => result.succeeded.push(user_id),
                Err(failure) => {
                    tracing::warn!(
                        %user_id,
                        operation = operation.name(),
                        error = ?failure.error,
                        message = %failure.message,
                        "bulk operation failed for user"
                    );
                    result.failed.push(failure);
                }
            }
        }

        self.record_summary(actor, operation, &result).await?;

        tracing::info!(
            operation = operation.name(),
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "bulk operation finished"
        );
        Ok(result)
    }

    async fn apply_one(
        &self,
        actor: Uuid,
        user_id: Uuid,
        operation: BulkOperation,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), BulkFailure> {
        let pool = &self.pool;
        match operation {
            BulkOperation::Assign { group_id } => {
                memberships::assign_membership(pool, actor, user_id, group_id, expires_at)
                    .await
                    .map_err(|e| failure(user_id, e.kind(), &e))?;
            }
            BulkOperation::Remove { group_id } => {
                memberships::remove_membership(pool, actor, user_id, group_id)
                    .await
                    .map_err(|e| failure(user_id, e.kind(), &e))?;
            }
            BulkOperation::Transfer { from_group_id, to_group_id } => {
                memberships::remove_membership(pool, actor, user_id, from_group_id)
                    .await
                    .map_err(|e| failure(user_id, e.kind(), &e))?;
                memberships::assign_membership(pool, actor, user_id, to_group_id, expires_at)
                    .await
                    .map_err(|e| {
                        failure(
                            user_id,
                            ErrorKind::PartialTransfer,
                            &format!("removed from {from_group_id} but not assigned to {to_group_id}: {e}"),
                        )
                    })?;
            }
        }
        Ok(())
    }

    async fn record_summary(&self, actor: Uuid, operation: BulkOperation, result: &BulkResult) -> AppResult<()> {
        let entry = NewAuditEntry::new(format!("bulk.{}", operation.name()), actor).values(
            None,
            Some(json!({
                "operation": operation,
                "succeeded": result.succeeded,
                "failed": result.failed,
            })),
        );

        let mut tx = db::begin_write(&self.pool).await?;
        audit::record(&mut tx, &entry).await?;
        tx.commit().await.map_err(AppError::from)
    }
}

fn failure(user_id: Uuid, error: ErrorKind, message: &dyn std::fmt::Display) -> BulkFailure {
    BulkFailure {
        user_id,
        error,
        message: message.to_string(),
    }
}
