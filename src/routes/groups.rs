//! Permission group administration.
//!
//! Reads require `access` on the permissions function, writes require `manage`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Action;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::group::{
    GroupCreateRequest, GroupFunctionGrant, GroupGrantRequest, GroupMembership, GroupUpdateRequest, PermissionGroup,
};
use crate::routes::{gate, Requirement};
use crate::store::{groups, memberships};

const READ: Requirement = Requirement::Permissions(Action::Access);
const WRITE: Requirement = Requirement::Permissions(Action::Manage);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/:id", get(get_group).put(update_group).delete(delete_group))
        .route("/groups/:id/deactivate", post(deactivate_group))
        .route("/groups/:id/members", get(list_members))
        .route("/groups/:id/grants", get(list_grants))
        .route("/groups/:id/grants/:function_id", put(set_grant).delete(remove_grant))
}

#[utoipa::path(
    get,
    path = "/groups",
    tag = "Groups",
    responses((status = 200, description = "All groups, defaults first", body = [PermissionGroup])),
    security(("bearerAuth" = []))
)]
pub async fn list_groups(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<PermissionGroup>>> {
    gate(&state, &actor, READ).await?;
    Ok(Json(groups::list_groups(&state.pool).await?))
}

#[utoipa::path(
    post,
    path = "/groups",
    tag = "Groups",
    request_body = GroupCreateRequest,
    responses(
        (status = 201, description = "Group created", body = PermissionGroup),
        (status = 409, description = "Group name already exists")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_group(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<GroupCreateRequest>,
) -> AppResult<(StatusCode, Json<PermissionGroup>)> {
    gate(&state, &actor, WRITE).await?;
    let group = groups::create_group(&state.pool, actor.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group detail", body = PermissionGroup),
        (status = 404, description = "Unknown group")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_group(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PermissionGroup>> {
    gate(&state, &actor, READ).await?;
    Ok(Json(groups::get_group(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    request_body = GroupUpdateRequest,
    responses((status = 200, description = "Group updated", body = PermissionGroup)),
    security(("bearerAuth" = []))
)]
pub async fn update_group(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<GroupUpdateRequest>,
) -> AppResult<Json<PermissionGroup>> {
    gate(&state, &actor, WRITE).await?;
    Ok(Json(groups::update_group(&state.pool, actor.user_id, id, req).await?))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 204, description = "Group, grants and memberships deleted"),
        (status = 409, description = "Default groups cannot be deleted")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_group(State(state): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    gate(&state, &actor, WRITE).await?;
    groups::delete_group(&state.pool, actor.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/groups/{id}/deactivate",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group deactivated", body = PermissionGroup),
        (status = 409, description = "Default groups cannot be deactivated")
    ),
    security(("bearerAuth" = []))
)]
pub async fn deactivate_group(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PermissionGroup>> {
    gate(&state, &actor, WRITE).await?;
    Ok(Json(groups::deactivate_group(&state.pool, actor.user_id, id).await?))
}

#[utoipa::path(
    get,
    path = "/groups/{id}/members",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses((status = 200, description = "Membership rows of the group, including inactive ones", body = [GroupMembership])),
    security(("bearerAuth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<GroupMembership>>> {
    gate(&state, &actor, READ).await?;
    groups::get_group(&state.pool, id).await?;
    Ok(Json(memberships::list_group_members(&state.pool, id).await?))
}

#[utoipa::path(
    get,
    path = "/groups/{id}/grants",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group id")),
    responses((status = 200, description = "Function grants of the group", body = [GroupFunctionGrant])),
    security(("bearerAuth" = []))
)]
pub async fn list_grants(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<GroupFunctionGrant>>> {
    gate(&state, &actor, READ).await?;
    groups::get_group(&state.pool, id).await?;
    Ok(Json(groups::list_group_grants(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/groups/{id}/grants/{function_id}",
    tag = "Groups",
    params(
        ("id" = Uuid, Path, description = "Group id"),
        ("function_id" = String, Path, description = "Catalog function id")
    ),
    request_body = GroupGrantRequest,
    responses(
        (status = 200, description = "Grant written", body = GroupFunctionGrant),
        (status = 422, description = "Function is not in the catalog")
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_grant(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, function_id)): Path<(Uuid, String)>,
    Json(req): Json<GroupGrantRequest>,
) -> AppResult<Json<GroupFunctionGrant>> {
    gate(&state, &actor, WRITE).await?;
    let grant = groups::set_group_grant(&state.pool, &state.catalog, actor.user_id, id, &function_id, req).await?;
    Ok(Json(grant))
}

#[utoipa::path(
    delete,
    path = "/groups/{id}/grants/{function_id}",
    tag = "Groups",
    params(
        ("id" = Uuid, Path, description = "Group id"),
        ("function_id" = String, Path, description = "Catalog function id")
    ),
    responses((status = 204, description = "Grant removed")),
    security(("bearerAuth" = []))
)]
pub async fn remove_grant(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, function_id)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    gate(&state, &actor, WRITE).await?;
    groups::remove_group_grant(&state.pool, actor.user_id, id, &function_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
