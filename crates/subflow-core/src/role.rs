//! # Actor Roles
//!
//! The authority class of whoever is acting on a subscription. Resolution
//! of a role from an authenticated identity happens upstream; this crate
//! only names the roles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SubflowError;

/// The role an actor holds with respect to a subscription.
///
/// `Admin` is a global super-role and is never looked up in the lifecycle
/// policy table. `Partner` and `Distributor` are governed by that table.
/// `Unknown` holds no permissions anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Role could not be resolved.
    Unknown,
    /// Global administrator.
    Admin,
    /// Partner that originates and owns subscriptions.
    Partner,
    /// Distributor that provisions authorized subscriptions.
    Distributor,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 4] = [Role::Unknown, Role::Admin, Role::Partner, Role::Distributor];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Admin => "admin",
            Self::Partner => "partner",
            Self::Distributor => "distributor",
        }
    }

    /// Whether this role bypasses the policy table.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SubflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "admin" => Ok(Self::Admin),
            "partner" => Ok(Self::Partner),
            "distributor" => Ok(Self::Distributor),
            other => Err(SubflowError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Partner".parse::<Role>().unwrap(), Role::Partner);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
    }

    #[test]
    fn parse_rejects_unrecognized_names() {
        let err = "reseller".parse::<Role>().unwrap_err();
        assert_eq!(err, SubflowError::UnknownRole("reseller".to_string()));
    }

    #[test]
    fn display_matches_parse() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn only_admin_bypasses() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Partner.is_admin());
        assert!(!Role::Distributor.is_admin());
        assert!(!Role::Unknown.is_admin());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Distributor).unwrap(), "\"distributor\"");
        let parsed: Role = serde_json::from_str("\"partner\"").unwrap();
        assert_eq!(parsed, Role::Partner);
    }
}
