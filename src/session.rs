//! Session cookie handling and request-scoped auth extraction.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use crate::app::AppState;
use crate::authz::{resolve_role, AdminSection, AuthState, PermissionAction, PolicyEvaluator, Role, RoleStore};
use crate::errors::AppError;
use crate::jwt::AuthUser;

pub const SESSION_COOKIE: &str = "__session";

/// Returns the value of a cookie from the `Cookie` headers, with any
/// surrounding quotes removed.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
}

fn base_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn header_value(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string()).map_err(|err| AppError::internal(format!("invalid session cookie: {err}")))
}

pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = base_cookie(token.to_string(), secure);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    header_value(&cookie)
}

pub fn cleared_session_cookie(secure: bool) -> Result<HeaderValue, AppError> {
    let mut cookie = base_cookie(String::new(), secure);
    cookie.make_removal();
    header_value(&cookie)
}

pub fn set_cookie_headers(cookie: HeaderValue) -> [(axum::http::HeaderName, HeaderValue); 1] {
    [(SET_COOKIE, cookie)]
}

/// Server-side view of the caller: verified token, stored role, allow-list.
///
/// Requests without a valid session resolve to `Unauthenticated`.
#[async_trait]
impl FromRequestParts<AppState> for AuthState {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = match AuthUser::from_request_parts(parts, state).await {
            Ok(auth) => auth,
            Err(_) => return Ok(AuthState::Unauthenticated),
        };

        let principal = match state.roles.principal(auth.user_id).await {
            Some(principal) => principal,
            None => return Ok(AuthState::Unauthenticated),
        };

        Ok(AuthState::Authenticated(principal))
    }
}

/// Authenticated caller with a server-resolved effective role.
#[derive(Debug, Clone)]
pub struct Access {
    pub user: AuthUser,
    pub role: Role,
}

impl Access {
    pub fn can(&self, state: &AppState, section: AdminSection, action: PermissionAction) -> bool {
        state.evaluator.can(self.role, section, action)
    }

    /// Authoritative check for data reads and writes.
    pub fn require(&self, state: &AppState, section: AdminSection, action: PermissionAction) -> Result<(), AppError> {
        if self.can(state, section, action) {
            return Ok(());
        }

        tracing::info!(
            user_id = %self.user.user_id,
            role = %self.role,
            section = %section,
            action = ?action,
            "forbidden"
        );
        Err(AppError::forbidden(format!("{action:?} on {section} not permitted")))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Access {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let role = resolve_role(state.roles.as_ref(), &state.admins, user.user_id, Some(&user.email)).await;

        Ok(Access { user, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; __session=abc.def.ghi; other=1"));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn read_cookie_scans_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("__session=tok"));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("tok"));
    }

    #[test]
    fn read_cookie_unquotes_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(r#"__session="tok"; theme=dark"#));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("tok"));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok", 3600, true).unwrap();
        let cookie = Cookie::parse(cookie.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    }

    #[test]
    fn cleared_cookie_expires_immediately() {
        let cookie = cleared_session_cookie(false).unwrap();
        let cookie = Cookie::parse(cookie.to_str().unwrap().to_string()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
        assert_eq!(cookie.secure(), None);
    }
}
