//! User roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user account, matching the `users.role` VARCHAR column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    BusinessAdmin,
    Staff,
    #[default]
    Client,
}

impl Role {
    /// Parse from the database / claim representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "super_admin" => Some(Self::SuperAdmin),
            "business_admin" => Some(Self::BusinessAdmin),
            "staff" => Some(Self::Staff),
            "client" => Some(Self::Client),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::BusinessAdmin => "business_admin",
            Self::Staff => "staff",
            Self::Client => "client",
        }
    }

    /// Roles that run a business day to day (admin or staff).
    pub fn is_business_member(&self) -> bool {
        matches!(self, Self::BusinessAdmin | Self::Staff)
    }

    /// Roles allowed to change business configuration.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::BusinessAdmin)
    }

    /// Roles a visitor may pick when registering.
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Self::BusinessAdmin | Self::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::SuperAdmin, Role::BusinessAdmin, Role::Staff, Role::Client] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("BUSINESS_ADMIN"), Some(Role::BusinessAdmin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
    }

    #[test]
    fn test_role_groups() {
        assert!(Role::Staff.is_business_member());
        assert!(!Role::SuperAdmin.is_business_member());
        assert!(Role::SuperAdmin.is_admin());
        assert!(!Role::Staff.is_admin());
        assert!(Role::Client.is_self_registrable());
        assert!(!Role::Staff.is_self_registrable());
    }
}
