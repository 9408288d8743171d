use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{effective_role, AdminAllowList, Role};

/// Principal represents an authenticated user as seen by authorization checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Option<Uuid>,
    pub email: String,
    /// Raw stored role value, unvalidated
    pub stored_role: Option<String>,
}

impl Principal {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            user_id: None,
            email: email.into(),
            stored_role: None,
        }
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_stored_role(mut self, role: impl Into<String>) -> Self {
        self.stored_role = Some(role.into());
        self
    }

    /// Stored role after validation. A missing value is `Customer`; an
    /// unrecognised one is also `Customer` and logged.
    pub fn validated_role(&self) -> Role {
        let role = Role::parse_or_default(self.stored_role.as_deref());
        if let Some(raw) = self.stored_role.as_deref() {
            if raw != role.as_str() {
                tracing::warn!(
                    user_id = ?self.user_id,
                    email = %self.email,
                    stored = raw,
                    "invalid stored role, using Customer"
                );
            }
        }
        role
    }

    pub fn effective_role(&self, admins: &AdminAllowList) -> Role {
        effective_role(Some(&self.email), Some(self.validated_role().as_str()), admins)
    }
}

/// Authentication state as consumed by gates and guards.
///
/// `Pending` means the principal has not been resolved yet and is never
/// treated as a denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Pending,
    Authenticated(Principal),
    Unauthenticated,
}

impl AuthState {
    /// Builds the state from an auth context shaped as `{ current_user, loading }`.
    pub fn from_context(current_user: Option<Principal>, loading: bool) -> Self {
        match (loading, current_user) {
            (true, _) => AuthState::Pending,
            (false, Some(principal)) => AuthState::Authenticated(principal),
            (false, None) => AuthState::Unauthenticated,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthState::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AuthState::Pending)
    }
}
