//! Authorization module - role resolution, permission table and gates
//!
//! This module implements the storefront's role-based access model:
//! - Effective role resolution (admin allow-list override + stored role)
//! - A static permission table over admin console sections
//! - Render-time gates for pages and fragments
//! - A role store abstraction over the persisted user role field
//!
//! Nothing in here returns errors. Unknown roles degrade to `Customer`
//! and undeclared permissions are denied.

mod allow_list;
mod evaluator;
mod gate;
mod permissions;
mod principal;
mod role;
pub mod store;

pub use allow_list::AdminAllowList;
pub use evaluator::{DefaultPolicyEvaluator, PolicyEvaluator};
pub use gate::{GateDecision, GateView, Navigation, PageGuard, PageView, PermissionGate, ACCESS_DENIED_NOTICE};
pub use permissions::{can_view_section, has_permission, AdminSection, PermissionAction};
pub use principal::{AuthState, Principal};
pub use role::{effective_role, Role};
pub use store::{resolve_role, RoleStore, SqliteRoleStore};

/// Everything a permission check needs besides the principal.
#[derive(Clone, Copy)]
pub struct AccessContext<'a> {
    pub admins: &'a AdminAllowList,
    pub evaluator: &'a dyn PolicyEvaluator,
}

impl<'a> AccessContext<'a> {
    pub fn new(admins: &'a AdminAllowList, evaluator: &'a dyn PolicyEvaluator) -> Self {
        Self { admins, evaluator }
    }

    pub fn role_of(&self, principal: &Principal) -> Role {
        principal.effective_role(self.admins)
    }

    pub fn permits(&self, principal: &Principal, section: AdminSection, action: PermissionAction) -> bool {
        self.evaluator.can(self.role_of(principal), section, action)
    }
}
