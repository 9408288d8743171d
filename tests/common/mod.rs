#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use oak_storefront::app::AppState;
use oak_storefront::authz::AdminAllowList;
use oak_storefront::jwt::JwtConfig;
use oak_storefront::{create_app_with_config, AppConfig};

pub const OWNER_EMAIL: &str = "owner@oakworks.test";
pub const JWT_SECRET: &str = "test-secret";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    /// Same configuration as `app`, for calling handlers without the route guard
    pub state: AppState,
    // keep the sqlite file alive for the duration of the test
    _dir: TempDir,
}

pub struct Registered {
    pub token: String,
    pub user_id: String,
}

pub async fn spawn_app() -> Result<TestApp> {
    let dir = tempfile::tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join("test.db");

    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    oak_storefront::db::MIGRATOR.run(&pool).await?;

    let config = AppConfig {
        jwt: JwtConfig::new(JWT_SECRET, 24),
        admins: AdminAllowList::new([OWNER_EMAIL]),
        secure_cookie: false,
    };
    let state = AppState::new(pool.clone(), config.clone());
    let app = create_app_with_config(pool.clone(), config);

    Ok(TestApp { app, pool, state, _dir: dir })
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Result<Response> {
        Ok(self.app.clone().oneshot(req).await?)
    }

    pub async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.send(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
        };
        Ok((status, value))
    }

    pub async fn register(&self, name: &str, email: &str) -> Result<Registered> {
        let body = json!({ "name": name, "email": email, "password": "password123" });
        let (status, value) = self.json("POST", "/auth/register", None, Some(body)).await?;
        if status != StatusCode::CREATED {
            panic!("register failed: {} - {}", status, value);
        }

        let token = value.get("token").and_then(Value::as_str).context("missing token")?.to_string();
        let user_id = value
            .get("user")
            .and_then(|u| u.get("id"))
            .and_then(Value::as_str)
            .context("missing user id")?
            .to_string();
        Ok(Registered { token, user_id })
    }

    /// Registers a user and gives them the Manager role through the owner account.
    pub async fn register_manager(&self, owner_token: &str, email: &str) -> Result<Registered> {
        let manager = self.register("Manager", email).await?;
        let uri = format!("/api/admin/users/{}/role", manager.user_id);
        let (status, value) = self.json("PUT", &uri, Some(owner_token), Some(json!({ "role": "Manager" }))).await?;
        assert_eq!(status, StatusCode::OK, "role update failed: {}", value);
        Ok(manager)
    }
}

pub fn get(uri: &str, session: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(session) = session {
        builder = builder.header("cookie", format!("__session={}", session));
    }
    Ok(builder.body(Body::empty())?)
}

pub fn location(resp: &Response) -> Option<String> {
    resp.headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

pub async fn text(resp: Response) -> Result<String> {
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
