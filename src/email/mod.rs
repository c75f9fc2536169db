// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Email Dispatch
//!
//! Outbound account emails (welcome, password reset). Delivery is always
//! fire-and-forget: handlers spawn the send and answer immediately, and a
//! failed send never changes the HTTP outcome.
//!
//! ## Dispatchers
//!
//! - [`HttpEmailDispatcher`] - POSTs JSON to a mail API (`EMAIL_API_URL`)
//! - [`DisabledDispatcher`] - used when no mail API is configured; every
//!   send fails with [`EmailError::NotConfigured`]
//! - [`OutboxDispatcher`] - keeps messages in memory (local runs, tests)

pub mod http;
pub mod templates;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

pub use http::HttpEmailDispatcher;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email delivery is not configured")]
    NotConfigured,

    #[error("mail API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail API rejected the message with status {0}")]
    Rejected(u16),
}

/// A rendered outbound email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outbound email collaborator.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;

    async fn send_welcome_email(&self, to: &str, name: &str) -> Result<(), EmailError> {
        self.send(templates::welcome(to, name)).await
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        reset_url: &str,
        ttl_minutes: i64,
    ) -> Result<(), EmailError> {
        self.send(templates::password_reset(to, name, reset_url, ttl_minutes))
            .await
    }
}

/// Dispatcher used when no mail API is configured.
pub struct DisabledDispatcher;

#[async_trait]
impl EmailDispatcher for DisabledDispatcher {
    async fn send(&self, _message: EmailMessage) -> Result<(), EmailError> {
        Err(EmailError::NotConfigured)
    }
}

/// In-memory outbox.
#[derive(Default)]
pub struct OutboxDispatcher {
    sent: Mutex<Vec<EmailMessage>>,
}

impl OutboxDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailDispatcher for OutboxDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

/// Send the welcome email in the background.
pub fn spawn_welcome_email(dispatcher: Arc<dyn EmailDispatcher>, to: String, name: String) {
    tokio::spawn(async move {
        if let Err(e) = dispatcher.send_welcome_email(&to, &name).await {
            tracing::warn!(error = %e, "Welcome email was not delivered");
        }
    });
}

/// Send the password reset email in the background.
///
/// When delivery fails the reset URL is written to the log so an operator
/// can hand it over out of band.
pub fn spawn_password_reset_email(
    dispatcher: Arc<dyn EmailDispatcher>,
    to: String,
    name: String,
    reset_url: String,
    ttl_minutes: i64,
) {
    tokio::spawn(async move {
        if let Err(e) = dispatcher
            .send_password_reset_email(&to, &name, &reset_url, ttl_minutes)
            .await
        {
            tracing::warn!(
                error = %e,
                reset_url = %reset_url,
                "Password reset email was not delivered; use the logged link"
            );
        }
    });
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    pub(crate) async fn wait_for_outbox(outbox: &OutboxDispatcher, count: usize) -> Vec<EmailMessage> {
        for _ in 0..50 {
            let sent = outbox.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        outbox.sent()
    }

    #[tokio::test]
    async fn disabled_dispatcher_reports_not_configured() {
        let result = DisabledDispatcher.send_welcome_email("a@x.com", "A").await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }

    #[tokio::test]
    async fn spawned_reset_email_reaches_outbox() {
        let outbox = Arc::new(OutboxDispatcher::new());
        spawn_password_reset_email(
            outbox.clone(),
            "a@x.com".into(),
            "Alice".into(),
            "https://app/reset-password?token=t".into(),
            15,
        );

        let sent = wait_for_outbox(&outbox, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.com");
        assert!(sent[0].text.contains("token=t"));
    }

    #[tokio::test]
    async fn spawned_send_failure_does_not_panic() {
        spawn_welcome_email(Arc::new(DisabledDispatcher), "a@x.com".into(), "A".into());
        tokio::task::yield_now().await;
    }
}
