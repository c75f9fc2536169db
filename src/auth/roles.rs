// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Principal roles and the partitions they map to.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Principal role.
///
/// Every principal lives in exactly one storage partition and its role is
/// derived from that partition, never from a free-form field:
///
/// - `Client` - learners and shop customers (self-registered)
/// - `Admin` - platform staff (bootstrapped, never self-registered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Platform staff
    Admin,
    /// Normal platform user
    Client,
}

impl Role {
    /// Partition lookup order when the caller does not pin a `userType`.
    pub const LOOKUP_ORDER: [Role; 2] = [Role::Admin, Role::Client];

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "client" => Some(Role::Client),
            _ => None,
        }
    }

    /// Name of the storage partition holding principals of this role.
    pub fn partition(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Client => "client",
        }
    }

    /// Role gate: is this role a member of `allowed`?
    pub fn is_allowed(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.partition())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_parses_correctly() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::from_str(" Client "), Some(Role::Client));
        assert_eq!(Role::from_str("support"), None);
    }

    #[test]
    fn admin_partition_is_checked_first() {
        assert_eq!(Role::LOOKUP_ORDER, [Role::Admin, Role::Client]);
    }

    #[test]
    fn role_gate_checks_membership_only() {
        assert!(Role::Admin.is_allowed(&[Role::Admin]));
        assert!(!Role::Client.is_allowed(&[Role::Admin]));
        assert!(Role::Client.is_allowed(&[Role::Admin, Role::Client]));
        assert!(!Role::Admin.is_allowed(&[]));
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""admin""#);
        assert_eq!(Role::Client.to_string(), "client");
    }
}
