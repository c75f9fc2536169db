// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! `require_auth` verifies the bearer token and attaches the
//! [`AuthenticatedUser`] to the request extensions; `require_role` runs after
//! it and checks role membership. Both are pure gates: the session registry
//! is not consulted.
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/admin/thing", get(handler))
//!     .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_role))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::authenticate;
use super::{AuthError, AuthenticatedUser, Role};
use crate::state::AppState;

/// Role set for admin-only routes.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Reject the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), &state) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Reject the request with 403 unless the authenticated role is allowed.
///
/// Must be layered inside [`require_auth`]; without an attached identity
/// the request is treated as unauthenticated.
pub async fn require_role(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>() else {
        return AuthError::MissingAuthHeader.into_response();
    };

    if !user.has_any_role(allowed) {
        tracing::info!(user_id = %user.user_id, role = %user.role, "Role gate rejected request");
        return AuthError::InsufficientPermissions.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, http::StatusCode, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    use crate::auth::tokens::TokenSubject;
    use crate::config::AppConfig;
    use crate::email::DisabledDispatcher;
    use crate::storage::database::tests::temp_db;

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.user_id
    }

    fn gated_router(state: &AppState) -> Router {
        Router::new()
            .route("/admin", get(whoami))
            .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_role))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
    }

    fn bearer_for(state: &AppState, role: Role) -> String {
        let issued = state
            .tokens
            .issue(&TokenSubject {
                subject: "p1".into(),
                role,
                email: "p1@x.com".into(),
            })
            .unwrap();
        format!("Bearer {}", issued.token)
    }

    fn get_with(auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/admin");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn gate_outcomes_by_credential() {
        let (db, _dir) = temp_db();
        let state = AppState::new(
            AppConfig::with_secret("middleware-secret"),
            db,
            Arc::new(DisabledDispatcher),
        );
        let app = gated_router(&state);

        let none = app.clone().oneshot(get_with(None)).await.unwrap();
        assert_eq!(none.status(), StatusCode::UNAUTHORIZED);

        let garbage = app.clone().oneshot(get_with(Some("Bearer x.y.z"))).await.unwrap();
        assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);

        let client = bearer_for(&state, Role::Client);
        let forbidden = app.clone().oneshot(get_with(Some(&client))).await.unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let admin = bearer_for(&state, Role::Admin);
        let ok = app.oneshot(get_with(Some(&admin))).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn role_gate_without_identity_is_unauthorized() {
        let app = Router::new()
            .route("/admin", get(|| async { "unreachable" }))
            .route_layer(middleware::from_fn_with_state(ADMIN_ROLES, require_role));

        let response = app.oneshot(get_with(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
