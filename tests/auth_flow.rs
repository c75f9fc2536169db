// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Router-level scenarios driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use verdant_auth::{
    api::router,
    auth::Role,
    config::AppConfig,
    email::OutboxDispatcher,
    state::AppState,
    storage::{AuthDatabase, DATABASE_FILE},
};

struct TestApp {
    app: Router,
    state: AppState,
    _dir: TempDir,
}

fn test_app(return_reset_url: bool) -> TestApp {
    let dir = TempDir::new().unwrap();
    let db = AuthDatabase::open(&dir.path().join(DATABASE_FILE)).unwrap();
    let mut config = AppConfig::with_secret("integration-test-secret");
    config.return_reset_url = return_reset_url;
    config.frontend_url = "https://verdant.example".into();

    let state = AppState::new(config, db, Arc::new(OutboxDispatcher::new()));
    TestApp {
        app: router(state.clone()),
        state,
        _dir: dir,
    }
}

struct Reply {
    status: StatusCode,
    raw: Bytes,
    json: Value,
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let raw = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&raw).unwrap_or(Value::Null);
        Reply { status, raw, json }
    }

    async fn post(&self, uri: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, None, Some(body)).await
    }

    async fn register(&self, nom: &str, email: &str, password: &str) -> Reply {
        self.post(
            "/register",
            json!({ "nom": nom, "email": email, "password": password }),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        self.post("/login", json!({ "email": email, "password": password }))
            .await
    }

    async fn reset_secret_for(&self, email: &str) -> String {
        let reply = self
            .post("/forgot-password", json!({ "email": email }))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        let url = reply.json["resetUrl"].as_str().unwrap();
        url::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }
}

fn token_of(reply: &Reply) -> String {
    reply.json["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_reset_scenario() {
    let t = test_app(true);

    let registered = t.register("Alice", "alice@x.com", "secret123").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.json["role"], "client");
    assert_eq!(registered.json["user"]["nom"], "Alice");

    let login = t.login("alice@x.com", "secret123").await;
    assert_eq!(login.status, StatusCode::OK);
    let t1 = token_of(&login);

    let me = t.call(Method::GET, "/me", Some(&t1), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["user"]["email"], "alice@x.com");
    assert_eq!(me.json["role"], "client");

    let secret = t.reset_secret_for("alice@x.com").await;
    let reset = t
        .post(
            "/reset-password",
            json!({ "token": secret, "newPassword": "newpass456" }),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    let old = t.login("alice@x.com", "secret123").await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = t.login("alice@x.com", "newpass456").await;
    assert_eq!(new.status, StatusCode::OK);
    assert_ne!(token_of(&new), t1);
}

#[tokio::test]
async fn unknown_email_login_is_generic_401() {
    let t = test_app(false);

    let reply = t.login("nope@x.com", "whatever").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json, json!({ "message": "Invalid credentials" }));
}

#[tokio::test]
async fn duplicate_registration_is_409() {
    let t = test_app(false);

    assert_eq!(
        t.register("A", "dup@x.com", "pw1").await.status,
        StatusCode::CREATED
    );
    let second = t.register("B", "dup@x.com", "pw2").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.json, json!({ "message": "Email already exists" }));
}

#[tokio::test]
async fn forgot_password_bodies_do_not_reveal_accounts() {
    let t = test_app(false);
    t.register("A", "known@x.com", "pw").await;

    let known = t
        .post("/forgot-password", json!({ "email": "known@x.com" }))
        .await;
    let unknown = t
        .post("/forgot-password", json!({ "email": "ghost@x.com" }))
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(known.raw, unknown.raw);
    assert!(known.json.get("resetUrl").is_none());
}

#[tokio::test]
async fn reset_secret_is_single_use() {
    let t = test_app(true);
    t.register("A", "a@x.com", "pw").await;
    let secret = t.reset_secret_for("a@x.com").await;

    let first = t
        .post(
            "/reset-password",
            json!({ "token": secret, "newPassword": "pw2" }),
        )
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = t
        .post(
            "/reset-password",
            json!({ "token": secret, "newPassword": "pw3" }),
        )
        .await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(second.json, json!({ "message": "Invalid or expired token" }));
}

#[tokio::test]
async fn unknown_reset_secret_matches_used_one() {
    let t = test_app(false);
    let reply = t
        .post(
            "/reset-password",
            json!({ "token": "00".repeat(32), "newPassword": "pw" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.json, json!({ "message": "Invalid or expired token" }));
}

#[tokio::test]
async fn reset_revokes_sessions_but_old_token_still_verifies() {
    let t = test_app(true);
    let registered = t.register("A", "a@x.com", "pw").await;
    let t1 = token_of(&registered);
    let user_id = registered.json["user"]["id"].as_str().unwrap().to_string();

    let secret = t.reset_secret_for("a@x.com").await;
    t.post(
        "/reset-password",
        json!({ "token": secret, "newPassword": "pw2" }),
    )
    .await;

    let sessions = t.state.db.list_sessions_for(&user_id, Role::Client).unwrap();
    assert!(sessions.is_empty());

    // The gate is stateless: T1 stays usable until its own expiry.
    let me = t.call(Method::GET, "/me", Some(&t1), None).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_session_audit_is_role_gated() {
    let t = test_app(false);
    let client = t.register("C", "c@x.com", "pw").await;
    let client_token = token_of(&client);
    let client_id = client.json["user"]["id"].as_str().unwrap().to_string();

    assert!(t
        .state
        .auth()
        .bootstrap_admin("root@x.com", "rootpw")
        .await
        .unwrap());
    let admin = t.login("root@x.com", "rootpw").await;
    assert_eq!(admin.json["role"], "admin");
    let admin_token = token_of(&admin);

    let uri = format!("/admin/principals/client/{client_id}/sessions");

    let anonymous = t.call(Method::GET, &uri, None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = t.call(Method::GET, &uri, Some(&client_token), None).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let listed = t.call(Method::GET, &uri, Some(&admin_token), None).await;
    assert_eq!(listed.status, StatusCode::OK);
    let sessions = listed.json.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].get("token").is_none());
    assert!(!listed.json.to_string().contains(&client_token));
    assert_eq!(sessions[0]["tokenFingerprint"].as_str().unwrap().len(), 16);
    assert_eq!(sessions[0]["subjectRole"], "client");
}

#[tokio::test]
async fn logout_removes_session_row() {
    let t = test_app(false);
    let registered = t.register("A", "a@x.com", "pw").await;
    let token = token_of(&registered);

    let missing = t.call(Method::POST, "/logout", None, None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let out = t.call(Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(out.status, StatusCode::OK);
    assert!(t.state.db.find_session(&token).unwrap().is_none());
}

#[tokio::test]
async fn missing_fields_are_400() {
    let t = test_app(false);

    let login = t.post("/login", json!({ "email": "a@x.com" })).await;
    assert_eq!(login.status, StatusCode::BAD_REQUEST);
    assert!(login.json["message"].is_string());

    let register = t
        .post("/register", json!({ "email": "a@x.com", "password": "pw" }))
        .await;
    assert_eq!(register.status, StatusCode::BAD_REQUEST);

    let forgot = t.post("/forgot-password", json!({})).await;
    assert_eq!(forgot.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_token() {
    let t = test_app(false);

    let none = t.call(Method::GET, "/me", None, None).await;
    assert_eq!(none.status, StatusCode::UNAUTHORIZED);

    let bad = t.call(Method::GET, "/me", Some("not-a-token"), None).await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert!(bad.json["message"].is_string());
}

#[tokio::test]
async fn token_payload_carries_identity_only() {
    let t = test_app(false);
    let registered = t.register("A", "a@x.com", "pw").await;
    let token = token_of(&registered);

    let payload = token.split('.').nth(1).unwrap();
    let claims: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

    assert_eq!(claims["sub"], registered.json["user"]["id"]);
    assert_eq!(claims["role"], "client");
    assert_eq!(claims["email"], "a@x.com");
    assert!(claims["exp"].as_i64().unwrap() > claims["iat"].as_i64().unwrap());
    assert!(claims.get("password").is_none());
    assert!(claims.get("passwordHash").is_none());
}

#[tokio::test]
async fn profile_update_round_trips() {
    let t = test_app(false);
    let token = token_of(&t.register("A", "a@x.com", "pw").await);

    let patched = t
        .call(
            Method::PATCH,
            "/me",
            Some(&token),
            Some(json!({ "nom": "Alicia", "phone": "0600000000" })),
        )
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.json["user"]["nom"], "Alicia");
    assert_eq!(patched.json["user"]["phone"], "0600000000");

    let cleared = t
        .call(
            Method::PATCH,
            "/me",
            Some(&token),
            Some(json!({ "phone": "" })),
        )
        .await;
    assert!(cleared.json["user"].get("phone").is_none());
}

#[tokio::test]
async fn change_password_swaps_credentials() {
    let t = test_app(false);
    let token = token_of(&t.register("A", "a@x.com", "old").await);

    let wrong = t
        .call(
            Method::POST,
            "/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "nope", "newPassword": "new" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let changed = t
        .call(
            Method::POST,
            "/change-password",
            Some(&token),
            Some(json!({ "currentPassword": "old", "newPassword": "new" })),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    assert_eq!(t.login("a@x.com", "old").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(t.login("a@x.com", "new").await.status, StatusCode::OK);
}
