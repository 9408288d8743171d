//! Persisted role lookup.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{effective_role, AdminAllowList, Principal, Role};

/// Source of the stored role field, keyed by user id.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Returns the principal for a user, or `None` when the user does not exist.
    async fn principal(&self, user_id: Uuid) -> Option<Principal>;

    /// Stored role for a user. Missing users, invalid values and lookup
    /// failures all yield `Customer`.
    async fn stored_role(&self, user_id: Uuid) -> Role {
        match self.principal(user_id).await {
            Some(principal) => principal.validated_role(),
            None => Role::Customer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteRoleStore {
    pool: SqlitePool,
}

impl SqliteRoleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for SqliteRoleStore {
    async fn principal(&self, user_id: Uuid) -> Option<Principal> {
        let row = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT email, role FROM users WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await;

        match row {
            Ok(Some((email, role))) => {
                let mut principal = Principal::new(email).with_user_id(user_id);
                principal.stored_role = role;
                Some(principal)
            }
            Ok(None) => {
                tracing::warn!(user_id = %user_id, "role lookup for unknown user");
                None
            }
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "role lookup failed");
                None
            }
        }
    }
}

/// Effective role for a user id, combining the store with the allow-list.
///
/// `email` is the caller-supplied address (e.g. from a verified token); the
/// stored email is used when it is absent.
pub async fn resolve_role(store: &dyn RoleStore, admins: &AdminAllowList, user_id: Uuid, email: Option<&str>) -> Role {
    let principal = store.principal(user_id).await;
    let stored_email = principal.as_ref().map(|p| p.email.as_str());
    let stored_role = principal.as_ref().map(Principal::validated_role);

    effective_role(email.or(stored_email), stored_role.as_ref().map(Role::as_str), admins)
}
