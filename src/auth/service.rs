// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account operations behind the HTTP handlers: login, registration,
//! password reset and change, logout, and profile access.
//!
//! Everything here returns [`ApiError`] so handlers can `?` straight
//! through. Storage calls are short redb transactions and run inline;
//! bcrypt runs on the blocking pool.

use chrono::Utc;

use super::claims::AuthenticatedUser;
use super::password;
use super::reset::{self, hash_secret, ResetSecret};
use super::roles::Role;
use super::tokens::TokenSubject;
use crate::email;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{
    ClientMetadata, Principal, PrincipalRecord, ProfilePatch, ResetRedemption, ResetSecretRecord,
    SessionRecord, StorageError,
};

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const EMAIL_EXISTS: &str = "Email already exists";
pub const INVALID_RESET_TOKEN: &str = "Invalid or expired token";
pub const USER_NOT_FOUND: &str = "User not found";

/// Returned by forgot-password whether or not the email is registered.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent.";
pub const RESET_DONE_MESSAGE: &str = "Password has been reset successfully";
pub const PASSWORD_CHANGED_MESSAGE: &str = "Password changed successfully";
pub const LOGGED_OUT_MESSAGE: &str = "Logged out successfully";

/// A principal together with the session just opened for it.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub principal: Principal,
    pub session: SessionRecord,
}

pub struct AuthService<'a> {
    state: &'a AppState,
}

fn required(value: &str) -> bool {
    !value.trim().is_empty()
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password produce the same 401, and an
    /// unknown email still pays for one bcrypt verification.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        pinned: Option<Role>,
        metadata: ClientMetadata,
    ) -> Result<SignedIn, ApiError> {
        if !required(email) || password.is_empty() {
            return Err(ApiError::validation("Email and password are required"));
        }

        let principal = self.state.db.find_principal_by_email(email, pinned)?;
        let stored = principal.as_ref().map(|p| p.record().password_hash.clone());
        let valid = password::verify_async(password.to_string(), stored).await?;

        match principal {
            Some(principal) if valid => {
                tracing::info!(user_id = %principal.id(), role = %principal.role(), "Login succeeded");
                self.open_session(principal, metadata)
            }
            _ => {
                tracing::info!("Login rejected");
                Err(ApiError::unauthorized(INVALID_CREDENTIALS))
            }
        }
    }

    /// Create a `client` principal, open a session and queue the welcome
    /// email.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        metadata: ClientMetadata,
    ) -> Result<SignedIn, ApiError> {
        if !required(name) || !required(email) || password.is_empty() {
            return Err(ApiError::validation(
                "Name, email and password are required",
            ));
        }

        let password_hash = password::hash_async(password.to_string()).await?;
        let record = PrincipalRecord::new(email, password_hash, name.trim());
        let principal = match self.state.db.insert_principal(Role::Client, &record) {
            Ok(principal) => principal,
            Err(StorageError::AlreadyExists(_)) => return Err(ApiError::conflict(EMAIL_EXISTS)),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(user_id = %principal.id(), "Client registered");

        email::spawn_welcome_email(
            self.state.mailer.clone(),
            principal.record().email.clone(),
            principal.record().name.clone(),
        );

        self.open_session(principal, metadata)
    }

    /// Issue a reset secret for `email` if it belongs to a principal.
    ///
    /// Returns the reset URL only when `RETURN_RESET_URL` is enabled and a
    /// principal was found. Callers answer with the same message either way.
    pub fn request_reset(&self, email: &str) -> Result<Option<String>, ApiError> {
        if !required(email) {
            return Err(ApiError::validation("Email is required"));
        }

        let Some(principal) = self.state.db.find_principal_by_email(email, None)? else {
            tracing::info!("Password reset requested for an unknown email");
            return Ok(None);
        };

        let secret = ResetSecret::generate().map_err(ApiError::internal)?;
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.state.config.reset_ttl)
            .ok_or_else(|| ApiError::internal("reset secret expiry out of range"))?;
        let record = ResetSecretRecord {
            subject_id: principal.id().to_string(),
            subject_role: principal.role(),
            secret_hash: secret.hash().to_string(),
            expires_at,
            created_at: now,
        };
        let replaced = self.state.db.replace_reset_secret(&record)?;

        let url = reset::reset_url(&self.state.config.frontend_url, secret.raw())
            .map_err(ApiError::internal)?;
        tracing::info!(
            user_id = %principal.id(),
            role = %principal.role(),
            replaced,
            "Password reset secret issued"
        );

        email::spawn_password_reset_email(
            self.state.mailer.clone(),
            principal.record().email.clone(),
            principal.record().name.clone(),
            url.clone(),
            self.state.config.reset_ttl.num_minutes(),
        );

        Ok(self.state.config.return_reset_url.then_some(url))
    }

    /// Exchange a raw reset secret for a new password.
    ///
    /// On success every reset secret and session of the principal is gone.
    pub async fn consume_reset(&self, raw_secret: &str, new_password: &str) -> Result<(), ApiError> {
        if !required(raw_secret) || new_password.is_empty() {
            return Err(ApiError::validation("Token and new password are required"));
        }

        let new_hash = password::hash_async(new_password.to_string()).await?;
        let redemption =
            self.state
                .db
                .redeem_reset_secret(&hash_secret(raw_secret.trim()), &new_hash, Utc::now());

        match redemption {
            Ok(ResetRedemption::Redeemed {
                principal,
                sessions_revoked,
            }) => {
                tracing::info!(
                    user_id = %principal.id(),
                    role = %principal.role(),
                    sessions_revoked,
                    "Password reset completed"
                );
                Ok(())
            }
            Ok(ResetRedemption::Rejected) | Err(StorageError::NotFound(_)) => {
                Err(ApiError::validation(INVALID_RESET_TOKEN))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Change the password of the signed-in principal and revoke all of its
    /// sessions.
    pub async fn change_password(
        &self,
        user: &AuthenticatedUser,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(ApiError::validation(
                "Current password and new password are required",
            ));
        }

        let principal = self.current_principal(user)?;
        let valid = password::verify_async(
            current_password.to_string(),
            Some(principal.record().password_hash.clone()),
        )
        .await?;
        if !valid {
            return Err(ApiError::unauthorized("Current password is incorrect"));
        }

        let new_hash = password::hash_async(new_password.to_string()).await?;
        let revoked =
            self.state
                .db
                .change_password_and_revoke(principal.role(), principal.id(), &new_hash)?;
        tracing::info!(user_id = %principal.id(), sessions_revoked = revoked, "Password changed");
        Ok(())
    }

    /// Drop the session row for exactly this token.
    pub fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::validation("Token is required"))?;

        let removed = self.state.db.revoke_session(token)?;
        tracing::debug!(removed, "Logout processed");
        Ok(())
    }

    /// Load the principal behind a verified token.
    pub fn current_principal(&self, user: &AuthenticatedUser) -> Result<Principal, ApiError> {
        self.state
            .db
            .find_principal_by_id(user.role, &user.user_id)?
            .ok_or_else(|| ApiError::not_found(USER_NOT_FOUND))
    }

    pub fn update_profile(
        &self,
        user: &AuthenticatedUser,
        patch: ProfilePatch,
    ) -> Result<Principal, ApiError> {
        if patch.name.as_deref().is_some_and(|name| !required(name)) {
            return Err(ApiError::validation("Name cannot be empty"));
        }
        if patch.is_empty() {
            return self.current_principal(user);
        }

        let principal = self.state.db.update_profile(user.role, &user.user_id, patch)?;
        tracing::info!(user_id = %principal.id(), "Profile updated");
        Ok(principal)
    }

    /// Session rows recorded for a principal.
    pub fn sessions_for(&self, role: Role, subject_id: &str) -> Result<Vec<SessionRecord>, ApiError> {
        Ok(self.state.db.list_sessions_for(subject_id, role)?)
    }

    /// Create the configured admin unless one with that email exists.
    ///
    /// Returns `true` when an admin was created.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<bool, ApiError> {
        if self
            .state
            .db
            .find_principal_by_email(email, Some(Role::Admin))?
            .is_some()
        {
            return Ok(false);
        }

        let password_hash = password::hash_async(password.to_string()).await?;
        let record = PrincipalRecord::new(email, password_hash, "Administrator");
        match self.state.db.insert_principal(Role::Admin, &record) {
            Ok(principal) => {
                tracing::info!(user_id = %principal.id(), "Bootstrap admin created");
                Ok(true)
            }
            Err(StorageError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn open_session(
        &self,
        principal: Principal,
        metadata: ClientMetadata,
    ) -> Result<SignedIn, ApiError> {
        let issued = self.state.tokens.issue(&TokenSubject {
            subject: principal.id().to_string(),
            role: principal.role(),
            email: principal.record().email.clone(),
        })?;

        let session = self.state.db.record_session(
            &issued.token,
            principal.id(),
            principal.role(),
            issued.issued_at,
            issued.expires_at,
            metadata,
        )?;

        Ok(SignedIn { principal, session })
    }
}
