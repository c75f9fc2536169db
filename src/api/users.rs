// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Endpoints for the signed-in principal.

use axum::{extract::State, Json};

use super::ApiJson;
use crate::auth::service::PASSWORD_CHANGED_MESSAGE;
use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::{ChangePasswordRequest, MeResponse, MessageResponse, UpdateProfileRequest};
use crate::state::AppState;

/// Get the current principal's profile.
#[utoipa::path(
    get,
    path = "/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User no longer exists"),
    )
)]
pub async fn get_me(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<MeResponse>, ApiError> {
    let principal = state.auth().current_principal(&user)?;
    Ok(Json((&principal).into()))
}

/// Update display name, phone or avatar.
#[utoipa::path(
    patch,
    path = "/me",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = MeResponse),
        (status = 400, description = "Invalid field"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "User no longer exists"),
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    Auth(user): Auth,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<MeResponse>, ApiError> {
    let principal = state.auth().update_profile(&user, req.into())?;
    Ok(Json((&principal).into()))
}

/// Change password with the current one. Revokes every session of the
/// principal.
#[utoipa::path(
    post,
    path = "/change-password",
    tag = "Users",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Unauthorized or wrong current password"),
        (status = 404, description = "User no longer exists"),
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    Auth(user): Auth,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .auth()
        .change_password(&user, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(MessageResponse::new(PASSWORD_CHANGED_MESSAGE)))
}
