// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Plain-text bodies for outbound account emails.

use super::EmailMessage;

pub fn welcome(to: &str, name: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome to Verdant!".to_string(),
        text: format!(
            "Hello {name},\n\
            \n\
            Your Verdant account is ready. Log in to follow your plants, \
            continue your courses and visit the shop.\n\
            \n\
            Happy growing!\n\
            The Verdant team"
        ),
    }
}

pub fn password_reset(to: &str, name: &str, reset_url: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Reset your Verdant password".to_string(),
        text: format!(
            "Hello {name},\n\
            \n\
            We received a request to reset your password. Open the link below \
            to choose a new one:\n\
            \n\
            {reset_url}\n\
            \n\
            This link expires in {ttl_minutes} minutes and can only be used once.\n\
            If you did not ask for a reset, you can ignore this email.\n\
            \n\
            The Verdant team"
        ),
    }
}
