use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AdminAllowList;

/// Closed set of roles a principal can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Customer,
    Manager,
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Manager, Role::SuperAdmin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Manager => "Manager",
            Role::SuperAdmin => "SuperAdmin",
        }
    }

    /// Parses a stored role value, falling back to `Customer` for anything
    /// that is not exactly one of the known literals.
    pub fn parse_or_default(raw: Option<&str>) -> Role {
        raw.and_then(|value| value.parse().ok()).unwrap_or_default()
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Role::Customer),
            "Manager" => Ok(Role::Manager),
            "SuperAdmin" => Ok(Role::SuperAdmin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Resolves the role used for authorization decisions.
///
/// An email on the admin allow-list always yields `SuperAdmin`. Otherwise the
/// stored role is used when it is a valid literal, else `Customer`.
pub fn effective_role(email: Option<&str>, stored_role: Option<&str>, admins: &AdminAllowList) -> Role {
    if let Some(email) = email {
        if admins.contains(email) {
            tracing::debug!(email = %email, "admin allow-list elevation");
            return Role::SuperAdmin;
        }
    }

    Role::parse_or_default(stored_role)
}
