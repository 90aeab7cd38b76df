use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::audit::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::authz::{AuthzMode, PermissionResolver};
use crate::bulk::BulkOperationCoordinator;
use crate::catalog::FunctionCatalog;
use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::routes::{audit, bulk, catalog, groups, health, memberships, overrides, positions, resolve};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub catalog: Arc<FunctionCatalog>,
    pub resolver: Arc<PermissionResolver>,
    pub bulk: BulkOperationCoordinator,
    pub mode: AuthzMode,
    pub audit_page_size: u32,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, catalog: FunctionCatalog, mode: AuthzMode) -> Self {
        let catalog = Arc::new(catalog);
        Self {
            bulk: BulkOperationCoordinator::new(pool.clone()),
            resolver: Arc::new(PermissionResolver::new(Arc::clone(&catalog))),
            pool,
            jwt: Arc::new(jwt),
            catalog,
            mode,
            audit_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_audit_page_size(mut self, page_size: u32) -> Self {
        self.audit_page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Read JWT settings, the function catalog, the enforcement mode and the
    /// audit page size from the environment.
    pub fn from_env(pool: SqlitePool) -> AppResult<Self> {
        let jwt = JwtConfig::from_env()?;
        let catalog = FunctionCatalog::load()?;
        let page_size = match std::env::var("AUDIT_PAGE_SIZE") {
            Ok(val) => val
                .parse::<u32>()
                .map_err(|_| AppError::configuration("AUDIT_PAGE_SIZE must be a positive integer"))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        Ok(Self::new(pool, jwt, catalog, AuthzMode::from_env()).with_audit_page_size(page_size))
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let state = AppState::from_env(pool)?;
    Ok(create_app_with_state(state))
}

pub fn create_app_with_state(state: AppState) -> Router {
    tracing::info!(
        mode = ?state.mode,
        functions = state.catalog.len(),
        "permission core ready"
    );

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health::health))
        .merge(catalog::routes())
        .merge(resolve::routes())
        .merge(groups::routes())
        .merge(memberships::routes())
        .merge(overrides::routes())
        .merge(positions::routes())
        .merge(bulk::routes())
        .merge(audit::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
