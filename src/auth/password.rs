// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing and verification.
//!
//! Stored password values come in two formats, told apart by a fixed prefix:
//!
//! | Format | Detection | Verification |
//! |--------|-----------|--------------|
//! | [`PasswordFormat::SlowHash`] | `$2a$`, `$2b$`, `$2x$`, `$2y$` | bcrypt |
//! | [`PasswordFormat::LegacyPlaintext`] | anything else | byte equality |
//!
//! Legacy rows are only ever read. Every new or changed password is stored
//! as bcrypt with a fresh random salt.
//!
//! bcrypt is CPU-bound, so the async entry points run it on the blocking
//! thread pool.

use std::sync::LazyLock;

/// bcrypt cost factor (2^10 rounds).
pub const BCRYPT_COST: u32 = 10;

const BCRYPT_PREFIXES: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];

/// Hash compared against when the principal does not exist, so an unknown
/// email costs the same bcrypt work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| bcrypt::hash("verdant-timing-equalizer", BCRYPT_COST).ok());

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Format of a stored password value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordFormat {
    /// Salted bcrypt hash
    SlowHash,
    /// Raw plaintext from rows predating hashing
    LegacyPlaintext,
}

impl PasswordFormat {
    /// Sniff the format of a stored value.
    pub fn detect(stored: &str) -> Self {
        if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
            PasswordFormat::SlowHash
        } else {
            PasswordFormat::LegacyPlaintext
        }
    }
}

/// Hash a new password for storage.
pub fn hash(plaintext: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(plaintext, BCRYPT_COST)?)
}

/// Verify a plaintext password against a stored value.
///
/// A corrupt bcrypt string verifies as `false` rather than erroring.
pub fn verify(plaintext: &str, stored: &str) -> bool {
    match PasswordFormat::detect(stored) {
        PasswordFormat::SlowHash => bcrypt::verify(plaintext, stored).unwrap_or(false),
        PasswordFormat::LegacyPlaintext => plaintext.as_bytes() == stored.as_bytes(),
    }
}

/// [`hash`] on the blocking pool.
pub async fn hash_async(plaintext: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash(&plaintext)).await?
}

/// [`verify`] on the blocking pool.
///
/// With `stored == None` a dummy verification is performed and `false`
/// returned.
pub async fn verify_async(plaintext: String, stored: Option<String>) -> Result<bool, PasswordError> {
    let ok = tokio::task::spawn_blocking(move || match stored {
        Some(stored) => verify(&plaintext, &stored),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = bcrypt::verify(&plaintext, dummy);
            }
            false
        }
    })
    .await?;
    Ok(ok)
}
