//! Server-rendered storefront and admin pages.
//!
//! Route-level redirects happen in `middleware::route_guard`; the gates here
//! decide what an admitted user actually sees.

use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use axum::Form;
use serde::Deserialize;

use crate::app::AppState;
use crate::authz::{AdminSection, AuthState, GateView, PageGuard, PageView, PermissionAction, PermissionGate, ACCESS_DENIED_NOTICE};
use crate::errors::{AppError, AppResult};
use crate::models::settings::SettingsArea;
use crate::routes::settings::{fetch_settings, save_settings};
use crate::session::Access;

const ADMIN_HOME: &str = "/admin";

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    /// JSON document for the area
    pub value: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomeTemplate {
    unauthorized: bool,
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate<'a> {
    redirect: &'a str,
}

#[derive(Template)]
#[template(path = "account.html")]
struct AccountTemplate<'a> {
    email: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "orders.html")]
struct OrdersTemplate {
    signed_in: bool,
}

#[derive(Template)]
#[template(path = "checkout.html")]
struct CheckoutTemplate {
    signed_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionLink {
    pub key: &'static str,
    pub title: &'static str,
}

#[derive(Template)]
#[template(path = "admin/dashboard.html")]
struct DashboardTemplate {
    links: Vec<SectionLink>,
    pending: bool,
    denied: bool,
    notice: &'static str,
}

#[derive(Template)]
#[template(path = "admin/settings.html")]
struct SettingsTemplate {
    title: &'static str,
    key: &'static str,
    current: String,
    editable: bool,
    editor_pending: bool,
}

fn render(template: &impl Template) -> AppResult<Html<String>> {
    template
        .render()
        .map(Html)
        .map_err(|err| AppError::internal(format!("template error: {err}")))
}

pub async fn home(Query(query): Query<HomeQuery>) -> AppResult<Html<String>> {
    render(&HomeTemplate {
        unauthorized: query.error.as_deref() == Some("unauthorized"),
    })
}

pub async fn login(Query(query): Query<LoginQuery>) -> AppResult<Html<String>> {
    render(&LoginTemplate {
        redirect: safe_redirect(query.redirect.as_deref()),
    })
}

pub async fn account(auth: AuthState) -> AppResult<Html<String>> {
    render(&AccountTemplate {
        email: auth.principal().map(|principal| principal.email.as_str()),
    })
}

pub async fn account_orders(auth: AuthState) -> AppResult<Html<String>> {
    render(&OrdersTemplate {
        signed_in: auth.principal().is_some(),
    })
}

pub async fn checkout(auth: AuthState) -> AppResult<Html<String>> {
    render(&CheckoutTemplate {
        signed_in: auth.principal().is_some(),
    })
}

pub async fn admin_dashboard(State(state): State<AppState>, auth: AuthState) -> AppResult<Html<String>> {
    render(&dashboard(&state, &auth))
}

fn dashboard(state: &AppState, auth: &AuthState) -> DashboardTemplate {
    let ctx = state.access_context();
    let views: Vec<GateView<SectionLink>> = AdminSection::ALL
        .into_iter()
        .map(|section| {
            PermissionGate::new(section).render(auth, ctx, || SectionLink {
                key: section.as_str(),
                title: section.title(),
            })
        })
        .collect();

    let pending = views.iter().any(GateView::is_pending);
    let denied = views.iter().all(|view| view.notice().is_some());

    DashboardTemplate {
        links: views.into_iter().filter_map(GateView::into_content).collect(),
        pending,
        denied,
        notice: ACCESS_DENIED_NOTICE,
    }
}

/// Settings page for one area.
///
/// The route guard only admits allow-listed users to `/admin`, so over HTTP
/// both gates below always pass; they apply the same permission table as the
/// settings API for callers that reach the handler another way.
pub async fn admin_settings(
    State(state): State<AppState>,
    auth: AuthState,
    Path(area): Path<String>,
) -> AppResult<PageView<Html<String>>> {
    let area: SettingsArea = area.parse()?;
    let ctx = state.access_context();

    let area = match PageGuard::new(area.section(), ADMIN_HOME).render(&auth, ctx, || area) {
        PageView::Page(area) => area,
        other => return Ok(other.map(|_| Html(String::new()))),
    };

    let current = match fetch_settings(&state.pool, area).await? {
        Some((value, _)) => area.public_view(value)?,
        None => serde_json::Value::Null,
    };

    let editor = PermissionGate::new(area.section())
        .action(PermissionAction::Edit)
        .fallback(())
        .render(&auth, ctx, || ());

    let page = render(&SettingsTemplate {
        title: area.section().title(),
        key: area.key(),
        current: serde_json::to_string_pretty(&current).unwrap_or_default(),
        editor_pending: editor.is_pending(),
        editable: editor.into_content().is_some(),
    })?;

    Ok(PageView::Page(page))
}

/// Form submission from the settings page. `Edit` is checked against the
/// server-resolved role, same as the JSON API.
pub async fn save_admin_settings(
    State(state): State<AppState>,
    access: Access,
    Path(area): Path<String>,
    Form(form): Form<SettingsForm>,
) -> AppResult<Redirect> {
    let area: SettingsArea = area.parse()?;
    access.require(&state, area.section(), PermissionAction::Edit)?;

    let payload = serde_json::from_str(&form.value)
        .map_err(|err| AppError::validation(format!("settings must be a JSON document: {err}")))?;
    save_settings(&state.pool, area, access.user.user_id, payload).await?;

    Ok(Redirect::to(&format!("{ADMIN_HOME}/settings/{}", area.key())))
}

/// Only same-site absolute paths are accepted as post-login targets.
fn safe_redirect(redirect: Option<&str>) -> &str {
    match redirect {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}
