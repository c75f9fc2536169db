// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only endpoints.
//!
//! Routes here sit behind `require_auth` and `require_role(ADMIN_ROLES)`.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::{Auth, Role},
    error::ApiError,
    state::AppState,
    models::SessionView,
};

/// List the session records of one principal.
#[utoipa::path(
    get,
    path = "/admin/principals/{role}/{id}/sessions",
    tag = "Admin",
    security(("bearer" = [])),
    params(
        ("role" = String, Path, description = "Partition: admin or client"),
        ("id" = String, Path, description = "Principal ID"),
    ),
    responses(
        (status = 200, description = "Session records", body = [SessionView]),
        (status = 400, description = "Unknown role"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - admin role required"),
    )
)]
pub async fn list_principal_sessions(
    State(state): State<AppState>,
    Auth(admin): Auth,
    Path((role, id)): Path<(String, String)>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let role = Role::from_str(&role)
        .ok_or_else(|| ApiError::validation("role must be 'admin' or 'client'"))?;

    let sessions = state.auth().sessions_for(role, &id)?;
    tracing::info!(
        admin_id = %admin.user_id,
        subject_id = %id,
        role = %role,
        count = sessions.len(),
        "Admin listed principal sessions"
    );
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}
