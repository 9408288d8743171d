//! Render-time permission gates.
//!
//! `PermissionGate` decides whether a fragment is shown, replaced by a
//! fallback, or replaced by the access denied notice. `PageGuard` does the
//! same for a whole page but answers a denial with a navigation instead.

use axum::response::{Html, IntoResponse, Redirect, Response};

use super::{AccessContext, AdminSection, AuthState, PermissionAction};

pub const ACCESS_DENIED_NOTICE: &str = "You do not have permission to access this section.";

const LOADING_PLACEHOLDER: &str = r#"<div class="loading" aria-busy="true"></div>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pending,
    Allowed,
    Denied,
}

impl GateDecision {
    pub fn evaluate(auth: &AuthState, ctx: AccessContext<'_>, section: AdminSection, action: PermissionAction) -> Self {
        match auth {
            AuthState::Pending => GateDecision::Pending,
            AuthState::Unauthenticated => GateDecision::Denied,
            AuthState::Authenticated(principal) => {
                if ctx.permits(principal, section, action) {
                    GateDecision::Allowed
                } else {
                    GateDecision::Denied
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView<T> {
    /// Auth still resolving; render neither content nor denial
    Pending,
    Content(T),
    Fallback(T),
    AccessDenied,
}

impl<T> GateView<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, GateView::Pending)
    }

    /// The granted content, if any.
    pub fn into_content(self) -> Option<T> {
        match self {
            GateView::Content(content) => Some(content),
            _ => None,
        }
    }

    /// Notice to show when access was denied and no fallback was given.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            GateView::AccessDenied => Some(ACCESS_DENIED_NOTICE),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PermissionGate<T> {
    section: AdminSection,
    action: PermissionAction,
    fallback: Option<T>,
}

impl<T> PermissionGate<T> {
    pub fn new(section: AdminSection) -> Self {
        Self {
            section,
            action: PermissionAction::View,
            fallback: None,
        }
    }

    pub fn action(mut self, action: PermissionAction) -> Self {
        self.action = action;
        self
    }

    pub fn fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn decide(&self, auth: &AuthState, ctx: AccessContext<'_>) -> GateDecision {
        GateDecision::evaluate(auth, ctx, self.section, self.action)
    }

    /// `children` is only invoked when access is granted.
    pub fn render<F>(self, auth: &AuthState, ctx: AccessContext<'_>, children: F) -> GateView<T>
    where
        F: FnOnce() -> T,
    {
        match self.decide(auth, ctx) {
            GateDecision::Pending => GateView::Pending,
            GateDecision::Allowed => GateView::Content(children()),
            GateDecision::Denied => match self.fallback {
                Some(fallback) => GateView::Fallback(fallback),
                None => GateView::AccessDenied,
            },
        }
    }
}

/// A navigation produced while rendering, performed once the render has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    target: String,
}

impl Navigation {
    pub fn to(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl IntoResponse for Navigation {
    fn into_response(self) -> Response {
        Redirect::to(&self.target).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView<T> {
    Pending,
    Page(T),
    Redirect(Navigation),
}

impl<T> PageView<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PageView<U> {
        match self {
            PageView::Pending => PageView::Pending,
            PageView::Page(page) => PageView::Page(f(page)),
            PageView::Redirect(navigation) => PageView::Redirect(navigation),
        }
    }
}

impl<T: IntoResponse> IntoResponse for PageView<T> {
    fn into_response(self) -> Response {
        match self {
            PageView::Pending => Html(LOADING_PLACEHOLDER).into_response(),
            PageView::Page(page) => page.into_response(),
            PageView::Redirect(navigation) => navigation.into_response(),
        }
    }
}

/// Wraps an entire page and redirects instead of showing a denial.
#[derive(Debug, Clone)]
pub struct PageGuard {
    section: AdminSection,
    action: PermissionAction,
    redirect_to: String,
}

impl PageGuard {
    pub fn new(section: AdminSection, redirect_to: impl Into<String>) -> Self {
        Self {
            section,
            action: PermissionAction::View,
            redirect_to: redirect_to.into(),
        }
    }

    pub fn action(mut self, action: PermissionAction) -> Self {
        self.action = action;
        self
    }

    /// The page is never rendered on denial; the redirect is handed back to the
    /// caller rather than issued from inside the render.
    pub fn render<T, F>(&self, auth: &AuthState, ctx: AccessContext<'_>, page: F) -> PageView<T>
    where
        F: FnOnce() -> T,
    {
        match GateDecision::evaluate(auth, ctx, self.section, self.action) {
            GateDecision::Pending => PageView::Pending,
            GateDecision::Allowed => PageView::Page(page()),
            GateDecision::Denied => {
                tracing::debug!(section = %self.section, target = %self.redirect_to, "page guard redirect");
                PageView::Redirect(Navigation::to(self.redirect_to.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{AdminAllowList, DefaultPolicyEvaluator, Principal};

    fn with_ctx<R>(f: impl FnOnce(AccessContext<'_>) -> R) -> R {
        let admins = AdminAllowList::new(["owner@oakworks.test"]);
        let evaluator = DefaultPolicyEvaluator::new();
        f(AccessContext::new(&admins, &evaluator))
    }

    fn customer() -> AuthState {
        AuthState::Authenticated(Principal::new("buyer@example.com").with_stored_role("Customer"))
    }

    #[test]
    fn pending_renders_neither_children_nor_fallback() {
        with_ctx(|ctx| {
            let mut rendered = false;
            let view = PermissionGate::new(AdminSection::Company)
                .fallback("fallback".to_string())
                .render(&AuthState::Pending, ctx, || {
                    rendered = true;
                    "secret".to_string()
                });
            assert_eq!(view, GateView::Pending);
            assert!(view.is_pending());
            assert_eq!(view.notice(), None);
            assert!(!rendered);
        });
    }

    #[test]
    fn allowed_renders_children() {
        with_ctx(|ctx| {
            let admin = AuthState::Authenticated(Principal::new("owner@oakworks.test"));
            let view = PermissionGate::new(AdminSection::Payments)
                .action(PermissionAction::Edit)
                .render(&admin, ctx, || "form".to_string());
            assert_eq!(view, GateView::Content("form".to_string()));
        });
    }

    #[test]
    fn denied_prefers_fallback_then_notice() {
        with_ctx(|ctx| {
            let view = PermissionGate::new(AdminSection::Company)
                .fallback("nope".to_string())
                .render(&customer(), ctx, || "secret".to_string());
            assert_eq!(view, GateView::Fallback("nope".to_string()));

            let view = PermissionGate::<String>::new(AdminSection::Company).render(&customer(), ctx, || "secret".to_string());
            assert_eq!(view, GateView::AccessDenied);
            assert_eq!(view.notice(), Some(ACCESS_DENIED_NOTICE));
            assert_eq!(view.into_content(), None);
        });
    }

    #[test]
    fn unauthenticated_is_denied() {
        with_ctx(|ctx| {
            let gate = PermissionGate::<String>::new(AdminSection::Orders);
            assert_eq!(gate.decide(&AuthState::Unauthenticated, ctx), GateDecision::Denied);
        });
    }

    #[test]
    fn page_guard_redirects_without_rendering() {
        with_ctx(|ctx| {
            let guard = PageGuard::new(AdminSection::Financial, "/admin");
            let mut rendered = false;
            let view: PageView<String> = guard.render(&customer(), ctx, || {
                rendered = true;
                "page".to_string()
            });
            assert_eq!(view, PageView::Redirect(Navigation::to("/admin")));
            assert!(!rendered);
        });
    }

    #[test]
    fn page_guard_waits_while_pending() {
        with_ctx(|ctx| {
            let guard = PageGuard::new(AdminSection::Financial, "/admin");
            let view: PageView<String> = guard.render(&AuthState::Pending, ctx, || "page".to_string());
            assert_eq!(view, PageView::Pending);
        });
    }

    #[test]
    fn manager_passes_page_guard_for_granted_section() {
        with_ctx(|ctx| {
            let manager = AuthState::Authenticated(Principal::new("m@oakworks.test").with_stored_role("Manager"));
            let guard = PageGuard::new(AdminSection::Orders, "/admin").action(PermissionAction::Edit);
            assert_eq!(guard.render(&manager, ctx, || 1), PageView::Page(1));
        });
    }
}
