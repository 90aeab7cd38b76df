//! Executive position matrix. Only super-admins may change it.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::Action;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::position::{PositionFunctionGrant, PositionGrantRequest};
use crate::models::profile::ExecPosition;
use crate::routes::{gate, Requirement};
use crate::store::positions;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/positions/:position/grants", get(list_grants))
        .route("/positions/:position/grants/:function_id", put(set_grant).delete(remove_grant))
}

#[utoipa::path(
    get,
    path = "/positions/{position}/grants",
    tag = "Positions",
    params(("position" = ExecPosition, Path, description = "Board position, e.g. tour-manager")),
    responses((status = 200, description = "Matrix rows for the position", body = [PositionFunctionGrant])),
    security(("bearerAuth" = []))
)]
pub async fn list_grants(
    State(state): State<AppState>,
    actor: Actor,
    Path(position): Path<ExecPosition>,
) -> AppResult<Json<Vec<PositionFunctionGrant>>> {
    gate(&state, &actor, Requirement::Permissions(Action::Access)).await?;
    Ok(Json(positions::list_position_grants(&state.pool, position).await?))
}

#[utoipa::path(
    put,
    path = "/positions/{position}/grants/{function_id}",
    tag = "Positions",
    params(
        ("position" = ExecPosition, Path, description = "Board position"),
        ("function_id" = String, Path, description = "Catalog function id")
    ),
    request_body = PositionGrantRequest,
    responses(
        (status = 200, description = "Matrix row written", body = PositionFunctionGrant),
        (status = 422, description = "Function is not in the catalog")
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_grant(
    State(state): State<AppState>,
    actor: Actor,
    Path((position, function_id)): Path<(ExecPosition, String)>,
    Json(req): Json<PositionGrantRequest>,
) -> AppResult<Json<PositionFunctionGrant>> {
    gate(&state, &actor, Requirement::SuperAdmin).await?;
    let grant =
        positions::set_position_grant(&state.pool, &state.catalog, actor.user_id, position, &function_id, req).await?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/positions/{position}/grants/{function_id}",
    tag = "Positions",
    params(
        ("position" = ExecPosition, Path, description = "Board position"),
        ("function_id" = String, Path, description = "Catalog function id")
    ),
    responses((status = 204, description = "Matrix row removed")),
    security(("bearerAuth" = []))
)]
pub async fn remove_grant(
    State(state): State<AppState>,
    actor: Actor,
    Path((position, function_id)): Path<(ExecPosition, String)>,
) -> AppResult<StatusCode> {
    gate(&state, &actor, Requirement::SuperAdmin).await?;
    positions::remove_position_grant(&state.pool, actor.user_id, position, &function_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
