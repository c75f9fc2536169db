// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried inside every bearer token we mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (principal ID within its partition)
    pub sub: String,

    /// Partition the subject lives in
    pub role: Role,

    /// Email at issue time
    pub email: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Absolute expiration timestamp
    pub exp: i64,

    /// Random token ID; keeps two tokens minted in the same second distinct
    pub jti: String,
}

/// Authenticated user information extracted from a verified token.
///
/// This is the `{subject, role, email}` triple handed to downstream
/// handlers by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Principal ID (token `sub` claim)
    pub user_id: String,

    /// Principal role
    pub role: Role,

    /// Email the token was issued for
    pub email: String,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified token claims.
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            email: claims.email,
            expires_at: claims.exp,
        }
    }

    /// Check if the user's role is one of `allowed`.
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        self.role.is_allowed(allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        TokenClaims {
            sub: "user_123".to_string(),
            role: Role::Admin,
            email: "staff@verdant.test".to_string(),
            iat: 1700000000,
            exp: 1700007200,
            jti: "jti-1".to_string(),
        }
    }

    #[test]
    fn from_claims_keeps_subject_role_and_email() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert_eq!(user.user_id, "user_123");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email, "staff@verdant.test");
        assert_eq!(user.expires_at, 1700007200);
    }

    #[test]
    fn has_any_role_checks_membership() {
        let user = AuthenticatedUser::from_claims(sample_claims());
        assert!(user.has_any_role(&[Role::Admin]));
        assert!(!user.has_any_role(&[Role::Client]));
    }
}
