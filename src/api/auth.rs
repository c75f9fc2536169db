// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: login, registration, password reset, logout.

use axum::{extract::State, http::StatusCode, Json};

use super::ApiJson;
use crate::auth::service::{
    SignedIn, LOGGED_OUT_MESSAGE, RESET_DONE_MESSAGE, RESET_REQUESTED_MESSAGE,
};
use crate::auth::{BearerToken, ClientInfo, Role};
use crate::error::ApiError;
use crate::models::{
    AuthResponse, ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, MessageResponse,
    RegisterRequest, ResetPasswordRequest,
};
use crate::state::AppState;

impl From<SignedIn> for AuthResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            token: signed_in.session.token,
            role: signed_in.principal.role(),
            user: (&signed_in.principal).into(),
        }
    }
}

fn pinned_role(user_type: Option<&str>) -> Result<Option<Role>, ApiError> {
    match user_type.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(raw) => Role::from_str(raw)
            .map(Some)
            .ok_or_else(|| ApiError::validation("userType must be 'admin' or 'client'")),
    }
}

/// Log in with email and password.
#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ClientInfo(metadata): ClientInfo,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let pinned = pinned_role(req.user_type.as_deref())?;
    let signed_in = state
        .auth()
        .login(&req.email, &req.password, pinned, metadata)
        .await?;
    Ok(Json(signed_in.into()))
}

/// Create a client account and log it in.
#[utoipa::path(
    post,
    path = "/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already exists"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ClientInfo(metadata): ClientInfo,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let signed_in = state
        .auth()
        .register(&req.nom, &req.email, &req.password, metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(signed_in.into())))
}

/// Request a password reset link.
///
/// The response is the same whether or not the email is registered.
#[utoipa::path(
    post,
    path = "/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = ForgotPasswordResponse),
        (status = 400, description = "Missing email"),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let reset_url = state.auth().request_reset(&req.email)?;
    Ok(Json(ForgotPasswordResponse {
        message: RESET_REQUESTED_MESSAGE.to_string(),
        reset_url,
    }))
}

/// Set a new password using a reset secret.
#[utoipa::path(
    post,
    path = "/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid or expired token"),
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth()
        .consume_reset(&req.token, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::new(RESET_DONE_MESSAGE)))
}

/// Drop the session row for the presented token.
///
/// The token itself stays cryptographically valid until it expires.
#[utoipa::path(
    post,
    path = "/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "Missing token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth().logout(token.as_deref())?;
    Ok(Json(MessageResponse::new(LOGGED_OUT_MESSAGE)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::email::OutboxDispatcher;
    use crate::storage::database::tests::temp_db;
    use crate::storage::ClientMetadata;

    fn test_state() -> (AppState, tempfile::TempDir) {
        let (db, dir) = temp_db();
        let state = AppState::new(
            AppConfig::with_secret("handler-secret"),
            db,
            Arc::new(OutboxDispatcher::new()),
        );
        (state, dir)
    }

    #[test]
    fn pinned_role_parsing() {
        assert_eq!(pinned_role(None).unwrap(), None);
        assert_eq!(pinned_role(Some("")).unwrap(), None);
        assert_eq!(pinned_role(Some("admin")).unwrap(), Some(Role::Admin));
        assert_eq!(pinned_role(Some("client")).unwrap(), Some(Role::Client));
        assert_eq!(
            pinned_role(Some("root")).unwrap_err().status,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn register_handler_returns_created() {
        let (state, _dir) = test_state();

        let (status, Json(body)) = register(
            State(state.clone()),
            ClientInfo(ClientMetadata::default()),
            ApiJson(RegisterRequest {
                nom: "Alice".into(),
                email: "alice@x.com".into(),
                password: "secret123".into(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.role, Role::Client);
        assert_eq!(body.user.nom, "Alice");
        assert!(state.tokens.verify(&body.token).is_ok());
    }

    #[tokio::test]
    async fn login_handler_rejects_missing_password() {
        let (state, _dir) = test_state();

        let err = login(
            State(state),
            ClientInfo(ClientMetadata::default()),
            ApiJson(LoginRequest {
                email: "a@x.com".into(),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_without_token_is_bad_request() {
        let (state, _dir) = test_state();
        let err = logout(State(state), BearerToken(None)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
