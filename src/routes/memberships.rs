use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::Action;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::group::{AssignGroupRequest, GroupMembership};
use crate::routes::{gate, Requirement};
use crate::store::{memberships, profiles};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/groups", get(list_user_groups).post(assign_group))
        .route("/users/:user_id/groups/:group_id", delete(remove_group))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}/groups",
    tag = "Memberships",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Membership rows of the user, including inactive and expired ones", body = [GroupMembership]),
        (status = 404, description = "Unknown user")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_user_groups(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<GroupMembership>>> {
    gate(&state, &actor, Requirement::Permissions(Action::Access)).await?;
    profiles::get_profile(&state.pool, user_id).await?;
    Ok(Json(memberships::list_user_memberships(&state.pool, user_id).await?))
}

#[utoipa::path(
    post,
    path = "/users/{user_id}/groups",
    tag = "Memberships",
    params(("user_id" = Uuid, Path, description = "User id")),
    request_body = AssignGroupRequest,
    responses(
        (status = 200, description = "Membership created or refreshed", body = GroupMembership),
        (status = 404, description = "Unknown user or group")
    ),
    security(("bearerAuth" = []))
)]
pub async fn assign_group(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AssignGroupRequest>,
) -> AppResult<Json<GroupMembership>> {
    gate(&state, &actor, Requirement::Permissions(Action::Manage)).await?;
    let membership =
        memberships::assign_membership(&state.pool, actor.user_id, user_id, req.group_id, req.expires_at).await?;
    Ok(Json(membership))
}

#[utoipa::path(
    delete,
    path = "/users/{user_id}/groups/{group_id}",
    tag = "Memberships",
    params(
        ("user_id" = Uuid, Path, description = "User id"),
        ("group_id" = Uuid, Path, description = "Group id")
    ),
    responses(
        (status = 204, description = "Membership deactivated"),
        (status = 404, description = "User is not an active member of the group")
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_group(
    State(state): State<AppState>,
    actor: Actor,
    Path((user_id, group_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    gate(&state, &actor, Requirement::Permissions(Action::Manage)).await?;
    memberships::remove_membership(&state.pool, actor.user_id, user_id, group_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
