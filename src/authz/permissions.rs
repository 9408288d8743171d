use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Role;

/// Areas of the admin console that are permissioned independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminSection {
    Company,
    Financial,
    Delivery,
    Payments,
    Analytics,
    Seo,
    Notifications,
    Roles,
    Content,
    Products,
    Orders,
    Users,
    Crm,
}

impl AdminSection {
    pub const ALL: [AdminSection; 13] = [
        AdminSection::Company,
        AdminSection::Financial,
        AdminSection::Delivery,
        AdminSection::Payments,
        AdminSection::Analytics,
        AdminSection::Seo,
        AdminSection::Notifications,
        AdminSection::Roles,
        AdminSection::Content,
        AdminSection::Products,
        AdminSection::Orders,
        AdminSection::Users,
        AdminSection::Crm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminSection::Company => "company",
            AdminSection::Financial => "financial",
            AdminSection::Delivery => "delivery",
            AdminSection::Payments => "payments",
            AdminSection::Analytics => "analytics",
            AdminSection::Seo => "seo",
            AdminSection::Notifications => "notifications",
            AdminSection::Roles => "roles",
            AdminSection::Content => "content",
            AdminSection::Products => "products",
            AdminSection::Orders => "orders",
            AdminSection::Users => "users",
            AdminSection::Crm => "crm",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AdminSection::Company => "Company Info",
            AdminSection::Financial => "Financial & VAT",
            AdminSection::Delivery => "Delivery Pricing",
            AdminSection::Payments => "Payment Gateways",
            AdminSection::Analytics => "Analytics",
            AdminSection::Seo => "SEO",
            AdminSection::Notifications => "Notifications",
            AdminSection::Roles => "Roles & Permissions",
            AdminSection::Content => "Content & Gallery",
            AdminSection::Products => "Products",
            AdminSection::Orders => "Orders",
            AdminSection::Users => "Users",
            AdminSection::Crm => "CRM & Leads",
        }
    }
}

impl fmt::Display for AdminSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminSection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminSection::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| format!("unknown admin section: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionAction {
    View,
    Edit,
}

impl Default for PermissionAction {
    fn default() -> Self {
        PermissionAction::View
    }
}

/// Grants held by `Manager`. Anything not listed here is denied.
const MANAGER_GRANTS: &[(AdminSection, PermissionAction)] = &[
    (AdminSection::Company, PermissionAction::View),
    (AdminSection::Delivery, PermissionAction::View),
    (AdminSection::Delivery, PermissionAction::Edit),
    (AdminSection::Analytics, PermissionAction::View),
    (AdminSection::Seo, PermissionAction::View),
    (AdminSection::Seo, PermissionAction::Edit),
    (AdminSection::Notifications, PermissionAction::View),
    (AdminSection::Content, PermissionAction::View),
    (AdminSection::Content, PermissionAction::Edit),
    (AdminSection::Products, PermissionAction::View),
    (AdminSection::Products, PermissionAction::Edit),
    (AdminSection::Orders, PermissionAction::View),
    (AdminSection::Orders, PermissionAction::Edit),
    (AdminSection::Crm, PermissionAction::View),
    (AdminSection::Crm, PermissionAction::Edit),
];

/// Static permission table lookup. Total over every triple, deny by default.
pub fn has_permission(role: Role, section: AdminSection, action: PermissionAction) -> bool {
    match role {
        Role::SuperAdmin => true,
        Role::Manager => MANAGER_GRANTS.contains(&(section, action)),
        Role::Customer => false,
    }
}

pub fn can_view_section(role: Role, section: AdminSection) -> bool {
    has_permission(role, section, PermissionAction::View)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: [PermissionAction; 2] = [PermissionAction::View, PermissionAction::Edit];

    #[test]
    fn super_admin_can_do_everything() {
        for section in AdminSection::ALL {
            for action in ACTIONS {
                assert!(has_permission(Role::SuperAdmin, section, action), "{section} {action:?}");
            }
        }
    }

    #[test]
    fn customer_can_do_nothing() {
        for section in AdminSection::ALL {
            for action in ACTIONS {
                assert!(!has_permission(Role::Customer, section, action), "{section} {action:?}");
            }
        }
    }

    #[test]
    fn manager_is_limited_to_declared_grants() {
        assert!(has_permission(Role::Manager, AdminSection::Orders, PermissionAction::Edit));
        assert!(has_permission(Role::Manager, AdminSection::Company, PermissionAction::View));
        assert!(!has_permission(Role::Manager, AdminSection::Company, PermissionAction::Edit));
        assert!(!has_permission(Role::Manager, AdminSection::Payments, PermissionAction::View));
        assert!(!has_permission(Role::Manager, AdminSection::Roles, PermissionAction::View));
        assert!(!has_permission(Role::Manager, AdminSection::Financial, PermissionAction::View));
        assert!(!has_permission(Role::Manager, AdminSection::Users, PermissionAction::Edit));
    }

    #[test]
    fn manager_edit_grants_imply_view() {
        for (section, action) in MANAGER_GRANTS {
            if *action == PermissionAction::Edit {
                assert!(can_view_section(Role::Manager, *section), "{section}");
            }
        }
    }

    #[test]
    fn can_view_section_matches_view_permission() {
        for role in Role::ALL {
            for section in AdminSection::ALL {
                assert_eq!(
                    can_view_section(role, section),
                    has_permission(role, section, PermissionAction::View)
                );
            }
        }
    }

    #[test]
    fn section_slugs_round_trip() {
        for section in AdminSection::ALL {
            assert_eq!(section.as_str().parse::<AdminSection>(), Ok(section));
        }
        assert!("settings".parse::<AdminSection>().is_err());
    }
}
