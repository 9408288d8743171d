mod common;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::Html;
use serde_json::json;

use oak_storefront::authz::{AuthState, PageView, Principal};
use oak_storefront::routes::pages;

use common::{location, spawn_app, OWNER_EMAIL};

fn manager() -> AuthState {
    AuthState::Authenticated(Principal::new("manager@example.com").with_stored_role("Manager"))
}

async fn settings_page(t: &common::TestApp, auth: AuthState, area: &str) -> Result<PageView<Html<String>>> {
    Ok(pages::admin_settings(State(t.state.clone()), auth, Path(area.to_string())).await?)
}

#[tokio::test]
async fn manager_settings_pages_follow_the_permission_table() -> Result<()> {
    let t = spawn_app().await?;

    // no VIEW on payments: the page guard hands back a redirect and renders nothing
    match settings_page(&t, manager(), "payments").await? {
        PageView::Redirect(navigation) => assert_eq!(navigation.target(), "/admin"),
        PageView::Page(Html(body)) => panic!("payments page rendered for a manager: {}", body),
        PageView::Pending => panic!("resolved state reported as pending"),
    }

    // VIEW without EDIT: read only fallback instead of the form
    match settings_page(&t, manager(), "company").await? {
        PageView::Page(Html(body)) => {
            assert!(body.contains("Read only"), "{}", body);
            assert!(!body.contains("<form"), "{}", body);
        }
        _ => panic!("company page should render for a manager"),
    }

    // VIEW and EDIT: the editor form
    match settings_page(&t, manager(), "delivery").await? {
        PageView::Page(Html(body)) => {
            assert!(body.contains(r#"<form method="post" action="/admin/settings/delivery">"#), "{}", body)
        }
        _ => panic!("delivery page should render for a manager"),
    }

    Ok(())
}

#[tokio::test]
async fn pending_and_anonymous_states_never_render_settings() -> Result<()> {
    let t = spawn_app().await?;

    assert!(matches!(settings_page(&t, AuthState::Pending, "company").await?, PageView::Pending));
    assert!(matches!(
        settings_page(&t, AuthState::Unauthenticated, "company").await?,
        PageView::Redirect(_)
    ));

    Ok(())
}

#[tokio::test]
async fn manager_dashboard_lists_only_visible_sections() -> Result<()> {
    let t = spawn_app().await?;

    let Html(body) = pages::admin_dashboard(State(t.state.clone()), manager()).await?;
    assert!(body.contains("/admin/settings/delivery"), "{}", body);
    assert!(body.contains("/admin/settings/orders"), "{}", body);
    assert!(!body.contains("/admin/settings/payments"), "{}", body);
    assert!(!body.contains("/admin/settings/roles"), "{}", body);

    let Html(body) = pages::admin_dashboard(State(t.state.clone()), AuthState::Unauthenticated).await?;
    assert!(body.contains("You do not have permission"), "{}", body);
    assert!(!body.contains("/admin/settings/"), "{}", body);

    Ok(())
}

#[tokio::test]
async fn settings_form_posts_through_the_edit_check() -> Result<()> {
    let t = spawn_app().await?;
    let owner = t.register("Owner", OWNER_EMAIL).await?;

    let document = json!({ "name": "Oakworks", "email": "hello@oakworks.test", "phone": "01234 567890" });
    let form = format!("value={}", urlencoding::encode(&document.to_string()));
    let req = Request::builder()
        .method("POST")
        .uri("/admin/settings/company")
        .header("cookie", format!("__session={}", owner.token))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form))?;
    let resp = t.send(req).await?;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp).as_deref(), Some("/admin/settings/company"));

    let (status, value) = t.json("GET", "/api/admin/settings/company", Some(&owner.token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["value"]["name"], "Oakworks");

    let req = Request::builder()
        .method("POST")
        .uri("/admin/settings/company")
        .header("cookie", format!("__session={}", owner.token))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("value=not-json"))?;
    let resp = t.send(req).await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}
