// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password reset secret storage.
//!
//! Only secret digests are stored. At most one live secret exists per
//! principal: issuing a new one removes the previous ones in the same write
//! transaction.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, WriteTransaction};

use super::database::{
    scan_index, subject_key, subject_prefix, AuthDatabase, StorageResult, RESET_SECRETS,
    RESET_SECRETS_BY_SUBJECT,
};
use super::principals::set_password_hash_in;
use super::records::{Principal, ResetSecretRecord};
use super::sessions::revoke_all_in;
use crate::auth::Role;

/// Outcome of trying to redeem a reset secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRedemption {
    /// Password replaced; the principal's secrets and sessions are gone.
    Redeemed {
        principal: Principal,
        sessions_revoked: usize,
    },
    /// No live secret matched. Unknown and expired secrets are not told
    /// apart.
    Rejected,
}

impl AuthDatabase {
    /// Store a new reset secret, deleting all earlier ones for the same
    /// principal first.
    pub fn replace_reset_secret(&self, secret: &ResetSecretRecord) -> StorageResult<usize> {
        let json = serde_json::to_vec(secret)?;
        let key = subject_key(secret.subject_role, &secret.subject_id, &secret.secret_hash);

        let write_txn = self.begin_write()?;
        let replaced = {
            let replaced = delete_secrets_for_in(&write_txn, &secret.subject_id, secret.subject_role)?;

            let mut secrets = write_txn.open_table(RESET_SECRETS)?;
            secrets.insert(secret.secret_hash.as_str(), json.as_slice())?;
            let mut index = write_txn.open_table(RESET_SECRETS_BY_SUBJECT)?;
            index.insert(key.as_slice(), secret.secret_hash.as_str())?;
            replaced
        };
        write_txn.commit()?;
        Ok(replaced)
    }

    /// Reset secrets currently stored for a principal.
    pub fn reset_secrets_for(
        &self,
        subject_id: &str,
        role: Role,
    ) -> StorageResult<Vec<ResetSecretRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(RESET_SECRETS_BY_SUBJECT)?;
        let secrets = read_txn.open_table(RESET_SECRETS)?;

        let mut result = Vec::new();
        for (_, hash) in scan_index(&index, &subject_prefix(role, subject_id))? {
            if let Some(value) = secrets.get(hash.as_str())? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(result)
    }

    /// Exchange a secret digest for a password change.
    ///
    /// In one write transaction: find a secret with `expires_at > now`,
    /// overwrite the principal's password hash, then delete every reset
    /// secret and session the principal holds. A matching but expired
    /// secret is deleted and reported as [`ResetRedemption::Rejected`].
    pub fn redeem_reset_secret(
        &self,
        secret_hash: &str,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<ResetRedemption> {
        let write_txn = self.begin_write()?;
        let outcome = {
            let secret: Option<ResetSecretRecord> = {
                let secrets = write_txn.open_table(RESET_SECRETS)?;
                let found = match secrets.get(secret_hash)? {
                    Some(value) => Some(serde_json::from_slice(value.value())?),
                    None => None,
                };
                found
            };

            match secret {
                None => ResetRedemption::Rejected,
                Some(secret) if secret.expires_at <= now => {
                    delete_secrets_for_in(&write_txn, &secret.subject_id, secret.subject_role)?;
                    ResetRedemption::Rejected
                }
                Some(secret) => {
                    let role = secret.subject_role;
                    set_password_hash_in(&write_txn, role, &secret.subject_id, new_password_hash)?;
                    delete_secrets_for_in(&write_txn, &secret.subject_id, role)?;
                    let sessions_revoked = revoke_all_in(&write_txn, &secret.subject_id, role)?;

                    let principal = {
                        let principals =
                            write_txn.open_table(super::database::principal_table(role))?;
                        let value = principals.get(secret.subject_id.as_str())?.ok_or_else(|| {
                            super::StorageError::NotFound(format!("{role} {}", secret.subject_id))
                        })?;
                        let record = serde_json::from_slice(value.value())?;
                        Principal::new(role, record)
                    };

                    ResetRedemption::Redeemed {
                        principal,
                        sessions_revoked,
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }
}

/// Delete every reset secret of a principal inside an open write transaction.
fn delete_secrets_for_in(
    write_txn: &WriteTransaction,
    subject_id: &str,
    role: Role,
) -> StorageResult<usize> {
    let mut index = write_txn.open_table(RESET_SECRETS_BY_SUBJECT)?;
    let entries = scan_index(&index, &subject_prefix(role, subject_id))?;

    let mut secrets = write_txn.open_table(RESET_SECRETS)?;
    for (key, hash) in &entries {
        secrets.remove(hash.as_str())?;
        index.remove(key.as_slice())?;
    }
    Ok(entries.len())
}
