use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::authz::{MembershipSnapshot, PermissionSnapshot, SnapshotSource};
use crate::db::row_parsers::{group_grant_from_row, membership_from_row};
use crate::errors::AppResult;
use crate::models::group::GroupFunctionGrant;
use crate::store::{overrides, positions, profiles};

/// Reads every row that can contribute to a user's decisions inside one
/// transaction, so a resolve never sees half of a concurrent mutation.
#[async_trait]
impl SnapshotSource for SqlitePool {
    async fn load_snapshot(&self, user_id: Uuid) -> AppResult<PermissionSnapshot> {
        let mut tx = self.begin().await?;
        let profile = profiles::get_profile(&mut *tx, user_id).await?;

        let position_grants = match (profile.is_exec_board, profile.exec_board_position) {
            (true, Some(position)) => positions::list_position_grants(&mut *tx, position).await?,
            _ => Vec::new(),
        };

        let membership_rows = sqlx::query(
            "SELECT m.user_id, m.group_id, m.is_active, m.expires_at, m.assigned_by, m.assigned_at, \
                    g.name AS group_name, g.is_active AS group_is_active \
             FROM user_permission_groups m JOIN permission_groups g ON g.id = m.group_id \
             WHERE m.user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_all(&mut *tx)
        .await?;

        let grant_rows = sqlx::query(
            "SELECT gr.group_id, gr.function_id, gr.enabled, gr.level, gr.scope \
             FROM group_function_grants gr \
             JOIN user_permission_groups m ON m.group_id = gr.group_id \
             WHERE m.user_id = ?",
        )
        .bind(user_id.to_string())
        .fetch_all(&mut *tx)
        .await?;

        let mut grants_by_group: HashMap<Uuid, Vec<GroupFunctionGrant>> = HashMap::new();
        for row in &grant_rows {
            let grant = group_grant_from_row(row)?;
            grants_by_group.entry(grant.group_id).or_default().push(grant);
        }

        let overrides = overrides::overrides_for_email(&mut *tx, &profile.email).await?;
        tx.commit().await?;

        let mut snapshot = PermissionSnapshot::new(profile).with_position_grants(position_grants);
        for row in &membership_rows {
            let membership = membership_from_row(row)?;
            let group_name: String = row.try_get("group_name")?;
            let group_is_active: bool = row.try_get("group_is_active")?;
            let grants = grants_by_group.remove(&membership.group_id).unwrap_or_default();

            let mut entry = MembershipSnapshot::new(membership, group_name).with_grants(grants);
            if !group_is_active {
                entry = entry.inactive_group();
            }
            snapshot = snapshot.with_membership(entry);
        }
        for grant in overrides {
            snapshot = snapshot.with_override(grant);
        }

        tracing::debug!(
            %user_id,
            memberships = snapshot.memberships.len(),
            overrides = snapshot.overrides.len(),
            "permission snapshot loaded"
        );
        Ok(snapshot)
    }
}
