// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time password reset secrets.
//!
//! A secret is 256 bits from the system CSPRNG, handed to the user
//! hex-encoded inside a reset link. Only its SHA-256 digest is stored.

use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use url::Url;

/// Secret length in bytes.
pub const RESET_SECRET_BYTES: usize = 32;

/// Path of the frontend page that accepts the reset link.
pub const RESET_PAGE_PATH: &str = "reset-password";

#[derive(Debug, thiserror::Error)]
pub enum ResetSecretError {
    #[error("system random number generator failed")]
    Rng,

    #[error("invalid frontend URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// A raw reset secret and the digest that gets persisted.
pub struct ResetSecret {
    raw: String,
    hash: String,
}

impl ResetSecret {
    /// Draw a fresh secret from the system CSPRNG.
    pub fn generate() -> Result<Self, ResetSecretError> {
        let mut bytes = [0u8; RESET_SECRET_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| ResetSecretError::Rng)?;

        let raw = hex::encode(bytes);
        let hash = hash_secret(&raw);
        Ok(Self { raw, hash })
    }

    /// The value sent to the user. Never persisted.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The digest stored in the reset-secret table.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Digest a raw secret the same way it was digested at issue time.
pub fn hash_secret(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Build `{base}/reset-password?token=<raw>`. A path prefix on the base
/// is kept.
pub fn reset_url(frontend_url: &str, raw_secret: &str) -> Result<String, ResetSecretError> {
    let mut base = Url::parse(frontend_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let mut url = base.join(RESET_PAGE_PATH)?;
    url.query_pairs_mut().append_pair("token", raw_secret);
    Ok(url.into())
}
