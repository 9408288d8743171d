use super::permissions::{has_permission, AdminSection, PermissionAction};
use super::Role;

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Check if a role may perform an action on an admin section
    fn can(&self, role: Role, section: AdminSection, action: PermissionAction) -> bool;
}

/// Default policy evaluator backed by the static permission table.
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn can(&self, role: Role, section: AdminSection, action: PermissionAction) -> bool {
        let allowed = has_permission(role, section, action);
        if !allowed {
            tracing::debug!(
                role = %role,
                section = %section,
                action = ?action,
                "permission denied"
            );
        }
        allowed
    }
}
