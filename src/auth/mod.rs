// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Token issuing, password hashing, password reset and the request gates.
//!
//! ## Auth Flow
//!
//! 1. `POST /login` or `POST /register` checks credentials against the
//!    `admin` / `client` partitions
//! 2. The server mints an HS256 token carrying `{sub, role, email}` and
//!    records a session row for it
//! 3. Later requests send `Authorization: Bearer <token>`; the gate checks
//!    signature and expiry only, then attaches the identity to the request
//!
//! ## Security
//!
//! - No expiry leeway
//! - Passwords hashed with bcrypt (cost 10); legacy plaintext rows still verify
//! - Reset secrets are 256 random bits, stored only as SHA-256 digests

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod reset;
pub mod roles;
pub mod service;
pub mod tokens;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::{Auth, BearerToken, ClientInfo};
pub use middleware::{require_auth, require_role, ADMIN_ROLES};
pub use password::PasswordError;
pub use roles::Role;
pub use service::AuthService;
pub use tokens::{TokenError, TokenIssuer};
