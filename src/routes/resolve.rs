use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, DecisionReason, EffectivePermission, GrantSource, PolicyEvaluator, SnapshotSource};
use crate::errors::{AppError, AppResult};
use crate::jwt::Actor;
use crate::routes::{gate, is_admin, Requirement};
use crate::utils::utc_now;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/resolve", post(resolve))
        .route("/users/:user_id/effective-permissions", get(effective_permissions))
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResolveRequest {
    /// Subject user; defaults to the caller.
    pub user_id: Option<Uuid>,
    #[schema(example = "tours.manage")]
    pub function_id: String,
    pub action: Action,
}

/// Decision as shown to a caller. `reason` and `source` are only filled in
/// for permission administrators.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DecisionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<GrantSource>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EffectivePermissionsResponse {
    pub user_id: Uuid,
    pub permissions: Vec<EffectivePermission>,
}

#[utoipa::path(
    post,
    path = "/resolve",
    tag = "Resolve",
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Decision for the subject user", body = ResolveResponse),
        (status = 403, description = "Resolving for another user without permission"),
        (status = 404, description = "Unknown function or user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn resolve(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<ResolveRequest>,
) -> AppResult<Json<ResolveResponse>> {
    let subject = req.user_id.unwrap_or(actor.user_id);
    let for_self = subject == actor.user_id;
    if !for_self {
        gate(&state, &actor, Requirement::Permissions(Action::Access)).await?;
    }
    state.catalog.by_id(&req.function_id)?;

    let snapshot = match state.pool.load_snapshot(subject).await {
        Ok(snapshot) => snapshot,
        // A caller without a profile simply holds nothing.
        Err(AppError::NotFound(_)) if for_self => {
            return Ok(Json(ResolveResponse { allowed: false, reason: None, source: None }));
        }
        Err(err) => return Err(err),
    };
    let decision = state.resolver.resolve(&snapshot, &req.function_id, req.action, utc_now());

    let response = if is_admin(&state, &actor).await? {
        ResolveResponse {
            allowed: decision.allowed,
            reason: Some(decision.reason),
            source: decision.source,
        }
    } else {
        ResolveResponse { allowed: decision.allowed, reason: None, source: None }
    };
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/effective-permissions",
    tag = "Resolve",
    params(("user_id" = Uuid, Path, description = "Subject user id")),
    responses(
        (status = 200, description = "Access and manage decisions for every catalog function", body = EffectivePermissionsResponse),
        (status = 404, description = "Unknown user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn effective_permissions(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<EffectivePermissionsResponse>> {
    gate(&state, &actor, Requirement::Permissions(Action::Access)).await?;

    let snapshot = state.pool.load_snapshot(user_id).await?;
    let permissions = state.resolver.effective_permissions(&snapshot, utc_now());

    Ok(Json(EffectivePermissionsResponse { user_id, permissions }))
}
