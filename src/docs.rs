use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::{AdminSection, PermissionAction, Role};
use crate::models;
use crate::routes::{auth, health, settings};

#[derive(OpenApi)]
#[openapi(
	paths(
		health::health,
		auth::register,
		auth::login,
		auth::me,
		auth::logout,
		settings::list_sections,
		settings::get_settings,
		settings::update_settings,
		settings::update_user_role
	),
	components(
		schemas(
			Role,
			AdminSection,
			PermissionAction,
			health::HealthResponse,
			models::user::User,
			models::user::AuthResponse,
			models::user::LoginRequest,
			models::user::RegisterRequest,
			models::user::MeResponse,
			models::user::RoleUpdateRequest,
			models::settings::SettingsArea,
			models::settings::SettingsResponse,
			models::settings::SectionAccess,
			models::settings::SectionsResponse,
			models::settings::CompanySettings,
			models::settings::FinancialSettings,
			models::settings::DeliverySettings,
			models::settings::PaymentsSettings,
			models::settings::AnalyticsSettings,
			models::settings::SeoSettings
		)
	),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Auth", description = "Accounts and sessions"),
		(name = "Admin", description = "Admin console settings and roles")
	)
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
	let mut doc = serde_json::to_value(ApiDoc::openapi())?;

	ensure_security_components(&mut doc)?;
	ensure_servers(&mut doc, port)?;

	serde_json::from_value(doc).context("OpenAPI document no longer deserializes")
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
	let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
		.try_it_out_enabled(true)
		.with_credentials(true)
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

fn root_object(doc: &mut Value) -> anyhow::Result<&mut Map<String, Value>> {
	doc.as_object_mut().context("OpenAPI root must be an object")
}

fn ensure_security_components(doc: &mut Value) -> anyhow::Result<()> {
	let components = root_object(doc)?
		.entry("components")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.context("components must be an object")?;

	let schemes = components
		.entry("securitySchemes")
		.or_insert_with(|| Value::Object(Map::new()))
		.as_object_mut()
		.context("securitySchemes must be an object")?;

	schemes.insert(
		"bearerAuth".to_string(),
		json!({
			"type": "http",
			"scheme": "bearer",
			"bearerFormat": "JWT"
		}),
	);
	schemes.insert(
		"sessionCookie".to_string(),
		json!({
			"type": "apiKey",
			"in": "cookie",
			"name": crate::session::SESSION_COOKIE
		}),
	);

	Ok(())
}

fn ensure_servers(doc: &mut Value, port: u16) -> anyhow::Result<()> {
	let server_url = format!("http://localhost:{port}");
	let root = root_object(doc)?;

	match root.get_mut("servers") {
		Some(Value::Array(arr)) => {
			let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
			if !has {
				arr.push(json!({ "url": server_url }));
			}
		}
		_ => {
			root.insert("servers".to_string(), json!([{ "url": server_url }]));
		}
	}

	Ok(())
}
