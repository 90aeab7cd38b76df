use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::catalog::category_info;
use crate::errors::AppResult;
use crate::jwt::Actor;
use crate::models::function::{AppFunction, CategoryInfo};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/functions", get(list_functions))
        .route("/functions/categories", get(list_categories))
        .route("/functions/:id", get(get_function))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySummary {
    #[schema(example = "tours")]
    pub tag: String,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
    pub function_count: usize,
}

impl CategorySummary {
    fn new(tag: &str, info: &'static CategoryInfo, function_count: usize) -> Self {
        Self {
            tag: tag.to_string(),
            label: info.label,
            color: info.color,
            icon: info.icon,
            function_count,
        }
    }
}

#[utoipa::path(
    get,
    path = "/functions",
    tag = "Catalog",
    responses((status = 200, description = "Catalog functions in declaration order", body = [AppFunction])),
    security(("bearerAuth" = []))
)]
pub async fn list_functions(State(state): State<AppState>, _actor: Actor) -> Json<Vec<AppFunction>> {
    Json(state.catalog.list_functions().to_vec())
}

#[utoipa::path(
    get,
    path = "/functions/{id}",
    tag = "Catalog",
    params(("id" = String, Path, description = "Function id, e.g. tours.manage")),
    responses(
        (status = 200, description = "Function detail", body = AppFunction),
        (status = 404, description = "Unknown function id")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_function(
    State(state): State<AppState>,
    _actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<AppFunction>> {
    Ok(Json(state.catalog.by_id(&id)?.clone()))
}

#[utoipa::path(
    get,
    path = "/functions/categories",
    tag = "Catalog",
    responses((status = 200, description = "Categories with display metadata", body = [CategorySummary])),
    security(("bearerAuth" = []))
)]
pub async fn list_categories(State(state): State<AppState>, _actor: Actor) -> Json<Vec<CategorySummary>> {
    let categories = state
        .catalog
        .categories()
        .into_iter()
        .map(|tag| CategorySummary::new(tag, category_info(tag), state.catalog.in_category(tag).count()))
        .collect();
    Json(categories)
}
