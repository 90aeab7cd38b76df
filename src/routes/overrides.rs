use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::app::AppState;
use crate::authz::Action;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::individual::{CategoryOverrideRequest, GrantOverrideRequest, IndividualOverride, OverrideListQuery};
use crate::routes::{gate, Requirement};
use crate::store::overrides;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/overrides", get(list_overrides).post(grant_override))
        .route("/overrides/category", post(grant_category))
        .route("/overrides/:email/:module", delete(revoke_override))
}

#[utoipa::path(
    get,
    path = "/overrides",
    tag = "Overrides",
    params(("email" = Option<String>, Query, description = "Only overrides for this e-mail")),
    responses((status = 200, description = "Individual overrides", body = [IndividualOverride])),
    security(("bearerAuth" = []))
)]
pub async fn list_overrides(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<OverrideListQuery>,
) -> AppResult<Json<Vec<IndividualOverride>>> {
    gate(&state, &actor, Requirement::Permissions(Action::Access)).await?;
    Ok(Json(overrides::list_overrides(&state.pool, query.email.as_deref()).await?))
}

#[utoipa::path(
    post,
    path = "/overrides",
    tag = "Overrides",
    request_body = GrantOverrideRequest,
    responses(
        (status = 200, description = "Override granted or refreshed", body = IndividualOverride),
        (status = 400, description = "Missing e-mail or unknown module")
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_override(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<GrantOverrideRequest>,
) -> AppResult<Json<IndividualOverride>> {
    gate(&state, &actor, Requirement::Permissions(Action::Manage)).await?;
    Ok(Json(overrides::grant_override(&state.pool, &state.catalog, actor.user_id, req).await?))
}

#[utoipa::path(
    post,
    path = "/overrides/category",
    tag = "Overrides",
    request_body = CategoryOverrideRequest,
    responses(
        (status = 200, description = "Overrides newly granted; modules already held are skipped", body = [IndividualOverride]),
        (status = 404, description = "Unknown category")
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_category(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CategoryOverrideRequest>,
) -> AppResult<Json<Vec<IndividualOverride>>> {
    gate(&state, &actor, Requirement::Permissions(Action::Manage)).await?;
    let granted = overrides::grant_category_overrides(
        &state.pool,
        &state.catalog,
        actor.user_id,
        &req.user_email,
        &req.category,
        req.expires_at,
    )
    .await?;
    Ok(Json(granted))
}

#[utoipa::path(
    delete,
    path = "/overrides/{email}/{module}",
    tag = "Overrides",
    params(
        ("email" = String, Path, description = "User e-mail"),
        ("module" = String, Path, description = "Module name")
    ),
    responses(
        (status = 204, description = "Override deactivated"),
        (status = 404, description = "No active override")
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_override(
    State(state): State<AppState>,
    actor: Actor,
    Path((email, module)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    gate(&state, &actor, Requirement::Permissions(Action::Manage)).await?;
    overrides::revoke_override(&state.pool, &state.catalog, actor.user_id, &email, &module).await?;
    Ok(StatusCode::NO_CONTENT)
}
