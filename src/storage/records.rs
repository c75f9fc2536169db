// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Stored account fields, identical for both partitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrincipalRecord {
    /// Unique identifier within the partition (UUID)
    pub id: String,
    /// Normalized email, unique within the partition
    pub email: String,
    /// bcrypt hash, or raw plaintext on legacy rows
    pub password_hash: String,
    /// Display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PrincipalRecord {
    /// Build a new record with a fresh ID.
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            password_hash: password_hash.into(),
            name: name.into(),
            phone: None,
            avatar_url: None,
            registered_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// A principal tagged by the partition it was loaded from.
///
/// The role is never stored on the record itself; it is whichever
/// partition the record lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Client(PrincipalRecord),
    Admin(PrincipalRecord),
}

impl Principal {
    pub fn new(role: Role, record: PrincipalRecord) -> Self {
        match role {
            Role::Client => Principal::Client(record),
            Role::Admin => Principal::Admin(record),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Client(_) => Role::Client,
            Principal::Admin(_) => Role::Admin,
        }
    }

    pub fn record(&self) -> &PrincipalRecord {
        match self {
            Principal::Client(r) | Principal::Admin(r) => r,
        }
    }

    pub fn id(&self) -> &str {
        &self.record().id
    }
}

/// Partial profile update. `None` leaves a field untouched; an empty
/// string clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.avatar_url.is_none()
    }

    pub(crate) fn apply(self, record: &mut PrincipalRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(phone) = self.phone {
            record.phone = (!phone.is_empty()).then_some(phone);
        }
        if let Some(avatar_url) = self.avatar_url {
            record.avatar_url = (!avatar_url.is_empty()).then_some(avatar_url);
        }
        record.updated_at = Some(Utc::now());
    }
}

/// Client metadata captured when a session is recorded. Best effort only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub client_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Server-side record of an issued bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// The exact bearer string issued
    pub token: String,
    pub subject_id: String,
    pub subject_role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Stored half of a password reset secret.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetSecretRecord {
    pub subject_id: String,
    pub subject_role: Role,
    /// SHA-256 of the raw secret (hex)
    pub secret_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
