// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. JSON field names are
//! camelCase; the display name travels as `nom`.
//!
//! Required request fields default to empty strings so that a missing field
//! is reported as a 400 validation error rather than a JSON rejection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::auth::Role;
use crate::storage::{Principal, ProfilePatch, SessionRecord};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Restrict the lookup to one partition (`admin` or `client`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Raw secret from the reset link
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Partial profile update. Omitted fields are left as they are; an empty
/// `phone` or `avatarUrl` clears the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<UpdateProfileRequest> for ProfilePatch {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfilePatch {
            name: req.nom.map(|n| n.trim().to_string()),
            phone: req.phone,
            avatar_url: req.avatar_url,
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Public view of a principal. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub nom: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Principal> for UserResponse {
    fn from(principal: &Principal) -> Self {
        let record = principal.record();
        Self {
            id: record.id.clone(),
            nom: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            avatar_url: record.avatar_url.clone(),
            role: principal.role(),
            registered_at: record.registered_at,
            updated_at: record.updated_at,
        }
    }
}

/// Returned by login and registration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
    pub role: Role,
}

impl From<&Principal> for MeResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            user: principal.into(),
            role: principal.role(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    /// Only present when `RETURN_RESET_URL=true` and the email is registered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_url: Option<String>,
}

/// Hex characters of the token digest shown to admins.
const TOKEN_FINGERPRINT_LEN: usize = 16;

/// Session as listed to admins. The bearer string itself is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Leading hex of SHA-256(token), enough to correlate log lines
    pub token_fingerprint: String,
    pub subject_id: String,
    pub subject_role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl From<SessionRecord> for SessionView {
    fn from(session: SessionRecord) -> Self {
        let mut token_fingerprint = hex::encode(Sha256::digest(session.token.as_bytes()));
        token_fingerprint.truncate(TOKEN_FINGERPRINT_LEN);
        Self {
            token_fingerprint,
            subject_id: session.subject_id,
            subject_role: session.subject_role,
            issued_at: session.issued_at,
            expires_at: session.expires_at,
            client_address: session.client_address,
            user_agent: session.user_agent,
        }
    }
}
