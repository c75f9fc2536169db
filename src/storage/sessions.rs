// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session registry.
//!
//! Every issued bearer token gets a row here. The registry is an audit and
//! bulk-revocation record: request authorization never consults it.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, WriteTransaction};

use super::database::{
    scan_index, subject_key, subject_prefix, AuthDatabase, StorageResult, SESSIONS,
    SESSIONS_BY_SUBJECT,
};
use super::records::{ClientMetadata, SessionRecord};
use crate::auth::Role;

impl AuthDatabase {
    /// Record an issued token.
    pub fn record_session(
        &self,
        token: &str,
        subject_id: &str,
        role: Role,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        metadata: ClientMetadata,
    ) -> StorageResult<SessionRecord> {
        let session = SessionRecord {
            token: token.to_string(),
            subject_id: subject_id.to_string(),
            subject_role: role,
            issued_at,
            expires_at,
            client_address: metadata.client_address,
            user_agent: metadata.user_agent,
        };
        let json = serde_json::to_vec(&session)?;
        let key = subject_key(role, subject_id, token);

        let write_txn = self.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            sessions.insert(token, json.as_slice())?;

            let mut index = write_txn.open_table(SESSIONS_BY_SUBJECT)?;
            index.insert(key.as_slice(), token)?;
        }
        write_txn.commit()?;

        Ok(session)
    }

    /// Look up the session row for an exact token string.
    pub fn find_session(&self, token: &str) -> StorageResult<Option<SessionRecord>> {
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(SESSIONS)?;
        let session = match sessions.get(token)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(session)
    }

    /// All session rows held by a principal.
    pub fn list_sessions_for(
        &self,
        subject_id: &str,
        role: Role,
    ) -> StorageResult<Vec<SessionRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SESSIONS_BY_SUBJECT)?;
        let sessions = read_txn.open_table(SESSIONS)?;

        let mut result = Vec::new();
        for (_, token) in scan_index(&index, &subject_prefix(role, subject_id))? {
            if let Some(value) = sessions.get(token.as_str())? {
                result.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(result)
    }

    /// Delete the session for an exact token. Returns whether a row existed.
    pub fn revoke_session(&self, token: &str) -> StorageResult<bool> {
        let write_txn = self.begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let existing: Option<SessionRecord> = match sessions.remove(token)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };

            if let Some(session) = &existing {
                let mut index = write_txn.open_table(SESSIONS_BY_SUBJECT)?;
                let key = subject_key(session.subject_role, &session.subject_id, token);
                index.remove(key.as_slice())?;
            }
            existing.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Delete every session held by a principal. Returns the number removed.
    pub fn revoke_all_sessions_for(&self, subject_id: &str, role: Role) -> StorageResult<usize> {
        let write_txn = self.begin_write()?;
        let removed = revoke_all_in(&write_txn, subject_id, role)?;
        write_txn.commit()?;
        Ok(removed)
    }
}

/// Delete every session of a principal inside an open write transaction.
pub(super) fn revoke_all_in(
    write_txn: &WriteTransaction,
    subject_id: &str,
    role: Role,
) -> StorageResult<usize> {
    let mut index = write_txn.open_table(SESSIONS_BY_SUBJECT)?;
    let entries = scan_index(&index, &subject_prefix(role, subject_id))?;

    let mut sessions = write_txn.open_table(SESSIONS)?;
    for (key, token) in &entries {
        sessions.remove(token.as_str())?;
        index.remove(key.as_slice())?;
    }
    Ok(entries.len())
}
