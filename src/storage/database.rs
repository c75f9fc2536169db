// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded auth database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `principals_admin` / `principals_client`: id → serialized PrincipalRecord
//! - `emails_admin` / `emails_client`: normalized email → id
//! - `sessions`: bearer token → serialized SessionRecord
//! - `sessions_by_subject`: composite key (role|subject|token) → token
//! - `reset_secrets`: secret hash → serialized ResetSecretRecord
//! - `reset_secrets_by_subject`: composite key (role|subject|hash) → hash
//!
//! The two principal partitions are physically separate tables, so email
//! uniqueness holds per partition only.
//!
//! Every multi-step mutation (issue reset secret, consume reset secret,
//! password change) runs inside one write transaction. redb allows a single
//! writer at a time, so those sequences are never observed half-applied.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

use super::records::{ResetSecretRecord, SessionRecord};
use crate::auth::Role;

// =============================================================================
// Table Definitions
// =============================================================================

pub(super) const ADMINS: TableDefinition<&str, &[u8]> = TableDefinition::new("principals_admin");
pub(super) const CLIENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("principals_client");

pub(super) const ADMIN_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("emails_admin");
pub(super) const CLIENT_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("emails_client");

pub(super) const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");
pub(super) const SESSIONS_BY_SUBJECT: TableDefinition<&[u8], &str> =
    TableDefinition::new("sessions_by_subject");

pub(super) const RESET_SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("reset_secrets");
pub(super) const RESET_SECRETS_BY_SUBJECT: TableDefinition<&[u8], &str> =
    TableDefinition::new("reset_secrets_by_subject");

/// Principal table for a partition.
pub(super) fn principal_table(role: Role) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match role {
        Role::Admin => ADMINS,
        Role::Client => CLIENTS,
    }
}

/// Email index table for a partition.
pub(super) fn email_table(role: Role) -> TableDefinition<'static, &'static str, &'static str> {
    match role {
        Role::Admin => ADMIN_EMAILS,
        Role::Client => CLIENT_EMAILS,
    }
}

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Prefix shared by every index entry of one principal: `role|subject|`.
pub(super) fn subject_prefix(role: Role, subject_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(role.partition().len() + subject_id.len() + 2);
    prefix.extend_from_slice(role.partition().as_bytes());
    prefix.push(b'|');
    prefix.extend_from_slice(subject_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Composite index key: `role|subject|value`.
pub(super) fn subject_key(role: Role, subject_id: &str, value: &str) -> Vec<u8> {
    let mut key = subject_prefix(role, subject_id);
    key.extend_from_slice(value.as_bytes());
    key
}

/// Exclusive upper bound for a prefix scan. Index values are ASCII, so a
/// trailing 0xFF sorts after all of them.
pub(super) fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    end.push(0xFF);
    end
}

/// Collect `(index_key, value)` pairs stored under `prefix`.
pub(super) fn scan_index(
    table: &impl ReadableTable<&'static [u8], &'static str>,
    prefix: &[u8],
) -> StorageResult<Vec<(Vec<u8>, String)>> {
    let end = prefix_end(prefix);
    let mut entries = Vec::new();
    for entry in table.range(prefix..end.as_slice())? {
        let (key, value) = entry?;
        entries.push((key.value().to_vec(), value.value().to_string()));
    }
    Ok(entries)
}

// =============================================================================
// AuthDatabase
// =============================================================================

/// Embedded ACID store for principals, sessions and reset secrets.
pub struct AuthDatabase {
    pub(super) db: Database,
}

/// Counts of rows removed by [`AuthDatabase::purge_expired`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub sessions: usize,
    pub reset_secrets: usize,
}

impl AuthDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ADMINS)?;
            let _ = write_txn.open_table(CLIENTS)?;
            let _ = write_txn.open_table(ADMIN_EMAILS)?;
            let _ = write_txn.open_table(CLIENT_EMAILS)?;
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(SESSIONS_BY_SUBJECT)?;
            let _ = write_txn.open_table(RESET_SECRETS)?;
            let _ = write_txn.open_table(RESET_SECRETS_BY_SUBJECT)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(SESSIONS)?;
        Ok(())
    }

    /// Delete every session and reset secret whose expiry is at or before
    /// `now`.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> StorageResult<PurgeReport> {
        let mut report = PurgeReport::default();

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let mut expired: Vec<SessionRecord> = Vec::new();
            for entry in sessions.iter()? {
                let (_, value) = entry?;
                let session: SessionRecord = serde_json::from_slice(value.value())?;
                if session.expires_at <= now {
                    expired.push(session);
                }
            }

            let mut index = write_txn.open_table(SESSIONS_BY_SUBJECT)?;
            for session in &expired {
                sessions.remove(session.token.as_str())?;
                let key = subject_key(session.subject_role, &session.subject_id, &session.token);
                index.remove(key.as_slice())?;
            }
            report.sessions = expired.len();
        }
        {
            let mut secrets = write_txn.open_table(RESET_SECRETS)?;
            let mut expired: Vec<ResetSecretRecord> = Vec::new();
            for entry in secrets.iter()? {
                let (_, value) = entry?;
                let secret: ResetSecretRecord = serde_json::from_slice(value.value())?;
                if secret.expires_at <= now {
                    expired.push(secret);
                }
            }

            let mut index = write_txn.open_table(RESET_SECRETS_BY_SUBJECT)?;
            for secret in &expired {
                secrets.remove(secret.secret_hash.as_str())?;
                let key =
                    subject_key(secret.subject_role, &secret.subject_id, &secret.secret_hash);
                index.remove(key.as_slice())?;
            }
            report.reset_secrets = expired.len();
        }
        write_txn.commit()?;

        Ok(report)
    }

    /// Start a write transaction for callers composing several mutations.
    pub(super) fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }
}

// =============================================================================
// Tests
// =============================================================================
