use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AccessContext, AdminAllowList, DefaultPolicyEvaluator, PolicyEvaluator, RoleStore, SqliteRoleStore};
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::middleware::route_guard;
use crate::routes::{auth, health, pages, settings};

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub admins: AdminAllowList,
    pub secure_cookie: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let secure_cookie = std::env::var("SESSION_SECURE_COOKIE")
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            jwt: JwtConfig::from_env()?,
            admins: AdminAllowList::from_env(),
            secure_cookie,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub admins: Arc<AdminAllowList>,
    pub evaluator: Arc<dyn PolicyEvaluator>,
    pub roles: Arc<dyn RoleStore>,
    pub secure_cookie: bool,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig) -> Self {
        Self {
            roles: Arc::new(SqliteRoleStore::new(pool.clone())),
            pool,
            jwt: Arc::new(config.jwt),
            admins: Arc::new(config.admins),
            evaluator: Arc::new(DefaultPolicyEvaluator::new()),
            secure_cookie: config.secure_cookie,
        }
    }

    pub fn access_context(&self) -> AccessContext<'_> {
        AccessContext::new(&self.admins, self.evaluator.as_ref())
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    Ok(create_app_with_config(pool, config))
}

pub fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Router {
    tracing::info!(admins = config.admins.len(), "building router");
    let state = AppState::new(pool, config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let admin_api = Router::new()
        .route("/sections", get(settings::list_sections))
        .route("/settings/:area", get(settings::get_settings).put(settings::update_settings))
        .route("/users/:id/role", put(settings::update_user_role));

    let page_routes = Router::new()
        .route("/", get(pages::home))
        .route("/login", get(pages::login))
        .route("/account", get(pages::account))
        .route("/account/orders", get(pages::account_orders))
        .route("/checkout", get(pages::checkout))
        .route("/admin", get(pages::admin_dashboard))
        .route(
            "/admin/settings/:area",
            get(pages::admin_settings).post(pages::save_admin_settings),
        );

    Router::new()
        .merge(page_routes)
        .route("/api/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/api/admin", admin_api)
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
