use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::app::AppState;
use crate::audit;
use crate::authz::Action;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::audit::{AuditPage, AuditQuery};
use crate::routes::{gate, Requirement};

pub fn routes() -> Router<AppState> {
    Router::new().route("/audit", get(list_audit))
}

#[utoipa::path(
    get,
    path = "/audit",
    tag = "Audit",
    params(
        ("from" = Option<String>, Query, description = "Inclusive lower bound (RFC3339)"),
        ("to" = Option<String>, Query, description = "Exclusive upper bound (RFC3339)"),
        ("target_user" = Option<uuid::Uuid>, Query, description = "Only entries about this user"),
        ("action_type" = Option<String>, Query, description = "e.g. membership.assigned"),
        ("before" = Option<i64>, Query, description = "Cursor from a previous page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 500")
    ),
    responses((status = 200, description = "Newest-first page of audit entries", body = AuditPage)),
    security(("bearerAuth" = []))
)]
pub async fn list_audit(
    State(state): State<AppState>,
    actor: Actor,
    Query(filter): Query<AuditQuery>,
) -> AppResult<Json<AuditPage>> {
    gate(&state, &actor, Requirement::Permissions(Action::Access)).await?;
    Ok(Json(audit::query(&state.pool, &filter, state.audit_page_size).await?))
}
