//! Request-time route guard.
//!
//! Advisory only: it saves obviously unauthorized users a round trip through
//! protected pages. Handlers that touch data re-check access with a verified
//! token (see `session::Access`).

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::app::AppState;
use crate::authz::AdminAllowList;
use crate::jwt::decode_unverified;
use crate::session::{read_cookie, SESSION_COOKIE};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/?error=unauthorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectedPath {
    Admin,
    Account,
    Checkout,
}

impl ProtectedPath {
    const PREFIXES: [(&'static str, ProtectedPath); 3] = [
        ("/admin", ProtectedPath::Admin),
        ("/account", ProtectedPath::Account),
        ("/checkout", ProtectedPath::Checkout),
    ];

    /// Matches `/prefix` and `/prefix/...`, not `/prefixed`.
    pub fn classify(path: &str) -> Option<Self> {
        Self::PREFIXES.into_iter().find_map(|(prefix, class)| {
            let rest = path.strip_prefix(prefix)?;
            (rest.is_empty() || rest.starts_with('/')).then_some(class)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Login { redirect: String },
    Unauthorized,
}

impl GuardDecision {
    pub fn location(&self) -> Option<String> {
        match self {
            GuardDecision::Proceed => None,
            GuardDecision::Login { redirect } => Some(login_location(redirect)),
            GuardDecision::Unauthorized => Some(UNAUTHORIZED_PATH.to_string()),
        }
    }
}

pub fn login_location(original_path: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(original_path))
}

/// Decides what happens to a request for `path` given the raw session cookie.
pub fn evaluate(path: &str, session: Option<&str>, admins: &AdminAllowList) -> GuardDecision {
    let Some(class) = ProtectedPath::classify(path) else {
        return GuardDecision::Proceed;
    };

    let Some(token) = session else {
        return GuardDecision::Login {
            redirect: path.to_string(),
        };
    };

    if class != ProtectedPath::Admin {
        return GuardDecision::Proceed;
    }

    match decode_unverified(token) {
        Ok(claims) => match claims.email() {
            Some(email) if admins.contains(email) => GuardDecision::Proceed,
            _ => GuardDecision::Unauthorized,
        },
        Err(err) => {
            tracing::debug!(error = %err, "undecodable session cookie");
            GuardDecision::Login {
                redirect: path.to_string(),
            }
        }
    }
}

pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let session = read_cookie(request.headers(), SESSION_COOKIE);
    let decision = evaluate(&path, session.as_deref(), &state.admins);

    match decision.location() {
        None => next.run(request).await,
        Some(location) => {
            tracing::info!(path = %path, location = %location, "route guard redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}
