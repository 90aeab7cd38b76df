use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::Action;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::bulk::{BulkRequest, BulkResult};
use crate::routes::{gate, Requirement};

pub fn routes() -> Router<AppState> {
    Router::new().route("/bulk", post(apply_bulk))
}

#[utoipa::path(
    post,
    path = "/bulk",
    tag = "Bulk",
    request_body = BulkRequest,
    responses((
        status = 200,
        description = "Per-user outcome; partial success is still a 200",
        body = BulkResult
    )),
    security(("bearerAuth" = []))
)]
pub async fn apply_bulk(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<BulkRequest>,
) -> AppResult<Json<BulkResult>> {
    gate(&state, &actor, Requirement::Permissions(Action::Manage)).await?;
    let result = state
        .bulk
        .apply_to_users(actor.user_id, &req.user_ids, req.operation, req.expires_at)
        .await?;
    Ok(Json(result))
}
