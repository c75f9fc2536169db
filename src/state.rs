// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthService, TokenIssuer};
use crate::config::AppConfig;
use crate::email::EmailDispatcher;
use crate::storage::AuthDatabase;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<AuthDatabase>,
    pub tokens: Arc<TokenIssuer>,
    pub mailer: Arc<dyn EmailDispatcher>,
}

impl AppState {
    pub fn new(config: AppConfig, db: AuthDatabase, mailer: Arc<dyn EmailDispatcher>) -> Self {
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.jwt_ttl);
        Self {
            config: Arc::new(config),
            db: Arc::new(db),
            tokens: Arc::new(tokens),
            mailer,
        }
    }

    /// Account operations bound to this state.
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self)
    }
}
