use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{resolve_role, Role};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::user::{AuthResponse, DbUser, LoginRequest, MeResponse, RegisterRequest, User};
use crate::session::{cleared_session_cookie, session_cookie, set_cookie_headers};
use crate::utils::{hash_password, normalize_email, utc_now, verify_password};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 409, description = "Email already in use"),
        (status = 400, description = "Invalid name or password too short")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let email = normalize_email(&payload.email)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!("password must be at least {MIN_PASSWORD_LEN} characters")));
    }
    ensure_email_available(&state.pool, &email).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id.to_string())
    .bind(payload.name.trim())
    .bind(&email)
    .bind(password_hash)
    .bind(Role::Customer.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await
    .map_err(|err| match err {
        // concurrent registrations and soft-deleted rows still hold the email
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict("email already in use"),
        other => other.into(),
    })?;

    tracing::info!(user_id = %user_id, "user registered");

    let user: User = fetch_user_by_id(&state.pool, user_id).await?.try_into()?;
    let token = state.jwt.encode(user.id, &user.email, Some(user.role.as_str()))?;
    let cookie = session_cookie(&token, state.jwt.ttl_seconds(), state.secure_cookie)?;

    Ok((StatusCode::CREATED, set_cookie_headers(cookie), Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();
    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, role, created_at, updated_at, deleted_at FROM users WHERE email = ? AND deleted_at IS NULL",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_ok = verify_password(&payload.password, &db_user.password_hash)?;
    if !password_ok {
        tracing::info!(email = %email, "failed login");
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user: User = db_user.try_into()?;
    let token = state.jwt.encode(user.id, &user.email, Some(user.role.as_str()))?;
    let cookie = session_cookie(&token, state.jwt.ttl_seconds(), state.secure_cookie)?;

    Ok((set_cookie_headers(cookie), Json(AuthResponse { token, user })))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = MeResponse)),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<MeResponse>> {
    let user: User = fetch_user_by_id(&state.pool, auth.user_id).await?.try_into()?;
    let effective_role = resolve_role(state.roles.as_ref(), &state.admins, user.id, Some(&user.email)).await;
    Ok(Json(MeResponse { user, effective_role }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged"))
)]
pub async fn logout(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok((
        set_cookie_headers(cleared_session_cookie(state.secure_cookie)?),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    ))
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND deleted_at IS NULL")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}

pub(crate) async fn fetch_user_by_id(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, role, created_at, updated_at, deleted_at FROM users WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(user_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}
