// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mail API dispatcher.
//!
//! Sends `{from, to, subject, text}` as JSON to the configured endpoint,
//! authenticating with `Authorization: Bearer <EMAIL_API_KEY>` when a key
//! is set.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{EmailDispatcher, EmailError, EmailMessage};
use crate::config::EmailApiConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpEmailDispatcher {
    config: EmailApiConfig,
    http: Client,
}

impl HttpEmailDispatcher {
    pub fn new(config: EmailApiConfig) -> Result<Self, EmailError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl EmailDispatcher for HttpEmailDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let payload = json!({
            "from": self.config.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
        });

        let mut request = self.http.post(&self.config.url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmailError::Rejected(status.as_u16()));
        }

        tracing::info!(subject = %message.subject, "Email handed to mail API");
        Ok(())
    }
}
