//! Admin settings API.
//!
//! Every handler resolves the caller's role from a verified token and the
//! role store, then checks the permission table before touching data.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{AdminSection, PermissionAction, Role};
use crate::errors::{AppError, AppResult};
use crate::models::settings::{SectionAccess, SectionsResponse, SettingsArea, SettingsResponse};
use crate::models::user::{RoleUpdateRequest, User};
use crate::routes::auth::fetch_user_by_id;
use crate::session::Access;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/api/admin/sections",
    tag = "Admin",
    responses((status = 200, description = "Sections visible to the caller", body = SectionsResponse)),
    security(("bearerAuth" = []))
)]
pub async fn list_sections(State(state): State<AppState>, access: Access) -> Json<SectionsResponse> {
    let sections = AdminSection::ALL
        .into_iter()
        .map(|section| SectionAccess {
            section,
            title: section.title().to_string(),
            view: access.can(&state, section, PermissionAction::View),
            edit: access.can(&state, section, PermissionAction::Edit),
        })
        .collect();

    Json(SectionsResponse {
        role: access.role,
        sections,
    })
}

#[utoipa::path(
    get,
    path = "/api/admin/settings/{area}",
    tag = "Admin",
    params(("area" = String, Path, description = "company | financial | delivery | payments | analytics | seo")),
    responses(
        (status = 200, description = "Settings document", body = SettingsResponse),
        (status = 403, description = "Caller may not view this area"),
        (status = 404, description = "Unknown area")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_settings(
    State(state): State<AppState>,
    access: Access,
    Path(area): Path<String>,
) -> AppResult<Json<SettingsResponse>> {
    let area: SettingsArea = area.parse()?;
    access.require(&state, area.section(), PermissionAction::View)?;

    let response = match fetch_settings(&state.pool, area).await? {
        Some((value, updated_at)) => SettingsResponse {
            area,
            value: Some(area.public_view(value)?),
            updated_at: Some(updated_at),
        },
        None => SettingsResponse {
            area,
            value: None,
            updated_at: None,
        },
    };

    Ok(Json(response))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings/{area}",
    tag = "Admin",
    params(("area" = String, Path, description = "company | financial | delivery | payments | analytics | seo")),
    responses(
        (status = 200, description = "Settings saved", body = SettingsResponse),
        (status = 403, description = "Caller may not edit this area"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_settings(
    State(state): State<AppState>,
    access: Access,
    Path(area): Path<String>,
    Json(payload): Json<Value>,
) -> AppResult<Json<SettingsResponse>> {
    let area: SettingsArea = area.parse()?;
    access.require(&state, area.section(), PermissionAction::Edit)?;

    let (public, updated_at) = save_settings(&state.pool, area, access.user.user_id, payload).await?;

    Ok(Json(SettingsResponse {
        area,
        value: Some(public),
        updated_at: Some(updated_at),
    }))
}

/// Validates and upserts a settings document. Callers check `Edit` first.
pub(crate) async fn save_settings(
    pool: &SqlitePool,
    area: SettingsArea,
    user_id: Uuid,
    payload: Value,
) -> AppResult<(Value, DateTime<Utc>)> {
    let (stored, public) = area.prepare(payload)?;
    let now = utc_now();

    sqlx::query(
        "INSERT INTO settings (key, value, updated_by, updated_at) VALUES (?, ?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_by = excluded.updated_by, updated_at = excluded.updated_at",
    )
    .bind(area.key())
    .bind(stored.to_string())
    .bind(user_id.to_string())
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, area = %area, "settings updated");

    Ok((public, now))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller may not manage roles"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    access: Access,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleUpdateRequest>,
) -> AppResult<Json<User>> {
    access.require(&state, AdminSection::Roles, PermissionAction::Edit)?;

    let role: Role = payload.role.parse().map_err(AppError::bad_request)?;
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(role.as_str())
        .bind(utc_now())
        .bind(user_id.to_string())
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("user not found"));
    }

    tracing::info!(
        actor_id = %access.user.user_id,
        user_id = %user_id,
        role = %role,
        "stored role changed"
    );

    let user: User = fetch_user_by_id(&state.pool, user_id).await?.try_into()?;
    Ok(Json(user))
}

pub(crate) async fn fetch_settings(pool: &SqlitePool, area: SettingsArea) -> AppResult<Option<(Value, DateTime<Utc>)>> {
    let row = sqlx::query_as::<_, (String, DateTime<Utc>)>("SELECT value, updated_at FROM settings WHERE key = ?")
        .bind(area.key())
        .fetch_optional(pool)
        .await?;

    row.map(|(raw, updated_at)| {
        serde_json::from_str(&raw)
            .map(|value| (value, updated_at))
            .map_err(|err| AppError::internal(format!("corrupt {area} settings: {err}")))
    })
    .transpose()
}
