use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{authz, errors, models, routes};

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::catalog::list_functions,
		routes::catalog::get_function,
		routes::catalog::list_categories,
		routes::resolve::resolve,
		routes::resolve::effective_permissions,
		routes::groups::list_groups,
		routes::groups::create_group,
		routes::groups::get_group,
		routes::groups::update_group,
		routes::groups::delete_group,
		routes::groups::deactivate_group,
		routes::groups::list_members,
		routes::groups::list_grants,
		routes::groups::set_grant,
		routes::groups::remove_grant,
		routes::memberships::list_user_groups,
		routes::memberships::assign_group,
		routes::memberships::remove_group,
		routes::overrides::list_overrides,
		routes::overrides::grant_override,
		routes::overrides::grant_category,
		routes::overrides::revoke_override,
		routes::positions::list_grants,
		routes::positions::set_grant,
		routes::positions::remove_grant,
		routes::bulk::apply_bulk,
		routes::audit::list_audit
	),
	components(
		schemas(
			routes::health::HealthResponse,
			routes::catalog::CategorySummary,
			routes::resolve::ResolveRequest,
			routes::resolve::ResolveResponse,
			routes::resolve::EffectivePermissionsResponse,
			authz::Action,
			authz::DecisionReason,
			authz::GrantSource,
			authz::EffectivePermission,
			errors::ErrorKind,
			models::function::AppFunction,
			models::profile::ExecPosition,
			models::group::PermissionGroup,
			models::group::GroupCreateRequest,
			models::group::GroupUpdateRequest,
			models::group::GrantLevel,
			models::group::GrantScope,
			models::group::GroupFunctionGrant,
			models::group::GroupGrantRequest,
			models::group::GroupMembership,
			models::group::AssignGroupRequest,
			models::individual::IndividualOverride,
			models::individual::GrantOverrideRequest,
			models::individual::CategoryOverrideRequest,
			models::position::PositionFunctionGrant,
			models::position::PositionGrantRequest,
			models::bulk::BulkOperation,
			models::bulk::BulkRequest,
			models::bulk::BulkFailure,
			models::bulk::BulkResult,
			models::audit::AuditEntry,
			models::audit::AuditPage
		)
	),
	tags(
		(name = "Health", description = "Liveness"),
		(name = "Catalog", description = "Application functions gated by the resolver"),
		(name = "Resolve", description = "Permission decisions"),
		(name = "Groups", description = "Permission groups and their function grants"),
		(name = "Memberships", description = "User to group assignments"),
		(name = "Overrides", description = "Per-module individual overrides"),
		(name = "Positions", description = "Executive board position matrix"),
		(name = "Bulk", description = "Batch membership changes"),
		(name = "Audit", description = "Append-only audit log")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	let root = doc
		.as_object_mut()
		.ok_or_else(|| anyhow::anyhow!("OpenAPI root must be an object"))?;
	ensure_security_components(root);
	root.entry("security").or_insert_with(|| json!([{ "bearerAuth": [] }]));
	ensure_servers(root, port);

	Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.persist_authorization(true);

	let doc_json = Arc::new(serde_json::to_value(&doc)?);
	let json_route = get(move || {
		let doc_json = Arc::clone(&doc_json);
		async move { Json((*doc_json).clone()) }
	});

	Ok(Router::new()
		.route("/api-docs/openapi.json", json_route)
		.merge(SwaggerUi::new("/docs").config(swagger_config)))
}

fn ensure_security_components(root: &mut Map<String, Value>) {
	let components = root
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()));
	let Some(components) = components.as_object_mut() else {
		return;
	};

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()));
	if let Some(schemes) = schemes.as_object_mut() {
		schemes.insert(
			"bearerAuth".to_string(),
			json!({
				"type": "http",
				"scheme": "bearer",
				"bearerFormat": "JWT"
			}),
		);
	}
}

fn ensure_servers(root: &mut Map<String, Value>, port: u16) {
	let server_url = format!("http://localhost:{port}");

	match root.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr
				.iter()
				.any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			root.insert("servers".to_string(), json!([{ "url": server_url }]));
		}
	}
}
