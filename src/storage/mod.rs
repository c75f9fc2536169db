// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Auth Storage Module
//!
//! Persistent storage for the authentication subsystem, in a single embedded
//! redb database file under `DATA_DIR`.
//!
//! ## Collections
//!
//! ```text
//! principals_admin / principals_client   # one partition per role
//! emails_admin / emails_client           # per-partition unique email index
//! sessions (+ sessions_by_subject)       # issued-token registry
//! reset_secrets (+ by_subject)           # hashed one-time reset secrets
//! ```
//!
//! Raw reset secrets and plaintext passwords never reach this module.

pub mod database;
pub mod principals;
pub mod records;
pub mod reset_secrets;
pub mod sessions;

pub use database::{AuthDatabase, PurgeReport, StorageError, StorageResult};
pub use principals::normalize_email;
pub use records::{
    ClientMetadata, Principal, PrincipalRecord, ProfilePatch, ResetSecretRecord, SessionRecord,
};
pub use reset_secrets::ResetRedemption;

/// File name of the database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "auth.redb";
