// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential store: principal lookup and mutation across the `client` and
//! `admin` partitions.

use redb::{ReadableDatabase, ReadableTable, WriteTransaction};
use unicode_normalization::UnicodeNormalization;

use super::database::{email_table, principal_table, AuthDatabase, StorageError, StorageResult};
use super::records::{Principal, PrincipalRecord, ProfilePatch};
use crate::auth::Role;

/// Canonical form of an email used as a lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

impl AuthDatabase {
    /// Look up a principal by email.
    ///
    /// With `pinned = None` the `admin` partition is checked first, then
    /// `client`; the first hit wins. With `pinned = Some(role)` only that
    /// partition is consulted.
    pub fn find_principal_by_email(
        &self,
        email: &str,
        pinned: Option<Role>,
    ) -> StorageResult<Option<Principal>> {
        let email = normalize_email(email);
        let partitions: &[Role] = match pinned {
            Some(ref role) => std::slice::from_ref(role),
            None => &Role::LOOKUP_ORDER,
        };

        let read_txn = self.db.begin_read()?;
        for &role in partitions {
            let emails = read_txn.open_table(email_table(role))?;
            let Some(id) = emails.get(email.as_str())? else {
                continue;
            };

            let principals = read_txn.open_table(principal_table(role))?;
            if let Some(value) = principals.get(id.value())? {
                let record: PrincipalRecord = serde_json::from_slice(value.value())?;
                return Ok(Some(Principal::new(role, record)));
            }
        }
        Ok(None)
    }

    /// Look up a principal by ID within one partition.
    pub fn find_principal_by_id(&self, role: Role, id: &str) -> StorageResult<Option<Principal>> {
        let read_txn = self.db.begin_read()?;
        let principals = read_txn.open_table(principal_table(role))?;
        let principal = match principals.get(id)? {
            Some(value) => {
                let record: PrincipalRecord = serde_json::from_slice(value.value())?;
                Some(Principal::new(role, record))
            }
            None => None,
        };
        Ok(principal)
    }

    /// Insert a new principal into a partition.
    ///
    /// The email uniqueness check and the insert share one write
    /// transaction, so two concurrent registrations of the same email
    /// cannot both succeed.
    pub fn insert_principal(&self, role: Role, record: &PrincipalRecord) -> StorageResult<Principal> {
        let mut record = record.clone();
        record.email = normalize_email(&record.email);

        let write_txn = self.begin_write()?;
        {
            let mut emails = write_txn.open_table(email_table(role))?;
            if emails.get(record.email.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!(
                    "{role} with email {}",
                    record.email
                )));
            }

            let mut principals = write_txn.open_table(principal_table(role))?;
            if principals.get(record.id.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("{role} {}", record.id)));
            }

            let json = serde_json::to_vec(&record)?;
            principals.insert(record.id.as_str(), json.as_slice())?;
            emails.insert(record.email.as_str(), record.id.as_str())?;
        }
        write_txn.commit()?;

        Ok(Principal::new(role, record))
    }

    /// Apply a partial profile update.
    pub fn update_profile(
        &self,
        role: Role,
        id: &str,
        patch: ProfilePatch,
    ) -> StorageResult<Principal> {
        let write_txn = self.begin_write()?;
        let record = {
            let mut record = load_for_update(&write_txn, role, id)?;
            patch.apply(&mut record);
            store_record(&write_txn, role, &record)?;
            record
        };
        write_txn.commit()?;

        Ok(Principal::new(role, record))
    }

    /// Replace a principal's password hash and drop every session it holds,
    /// atomically.
    pub fn change_password_and_revoke(
        &self,
        role: Role,
        id: &str,
        password_hash: &str,
    ) -> StorageResult<usize> {
        let write_txn = self.begin_write()?;
        let revoked = {
            set_password_hash_in(&write_txn, role, id, password_hash)?;
            super::sessions::revoke_all_in(&write_txn, id, role)?
        };
        write_txn.commit()?;
        Ok(revoked)
    }
}

/// Read a principal record inside a write transaction.
fn load_for_update(
    write_txn: &WriteTransaction,
    role: Role,
    id: &str,
) -> StorageResult<PrincipalRecord> {
    let principals = write_txn.open_table(principal_table(role))?;
    let value = principals
        .get(id)?
        .ok_or_else(|| StorageError::NotFound(format!("{role} {id}")))?;
    let record = serde_json::from_slice(value.value())?;
    Ok(record)
}

fn store_record(
    write_txn: &WriteTransaction,
    role: Role,
    record: &PrincipalRecord,
) -> StorageResult<()> {
    let json = serde_json::to_vec(record)?;
    let mut principals = write_txn.open_table(principal_table(role))?;
    principals.insert(record.id.as_str(), json.as_slice())?;
    Ok(())
}

/// Overwrite the stored password hash inside an open write transaction.
pub(super) fn set_password_hash_in(
    write_txn: &WriteTransaction,
    role: Role,
    id: &str,
    password_hash: &str,
) -> StorageResult<()> {
    let mut record = load_for_update(write_txn, role, id)?;
    record.password_hash = password_hash.to_string();
    record.updated_at = Some(chrono::Utc::now());
    store_record(write_txn, role, &record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::tests::temp_db;

    fn record(email: &str) -> PrincipalRecord {
        PrincipalRecord::new(email, "$2b$10$hash", "Someone")
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@X.com "), "alice@x.com");
        // Fullwidth characters fold under NFKC
        assert_eq!(normalize_email("ａｌｉｃｅ@x.com"), "alice@x.com");
    }

    #[test]
    fn insert_and_find_by_email_and_id() {
        let (db, _dir) = temp_db();
        let inserted = db
            .insert_principal(Role::Client, &record("Alice@X.com"))
            .unwrap();
        assert_eq!(inserted.record().email, "alice@x.com");

        let found = db
            .find_principal_by_email("alice@x.com", None)
            .unwrap()
            .unwrap();
        assert_eq!(found.role(), Role::Client);
        assert_eq!(found.id(), inserted.id());

        let by_id = db
            .find_principal_by_id(Role::Client, inserted.id())
            .unwrap()
            .unwrap();
        assert_eq!(by_id, inserted);
        assert!(db
            .find_principal_by_id(Role::Admin, inserted.id())
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_email_in_same_partition_is_rejected() {
        let (db, _dir) = temp_db();
        db.insert_principal(Role::Client, &record("dup@x.com")).unwrap();

        let result = db.insert_principal(Role::Client, &record("DUP@x.com"));
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn same_email_may_exist_in_both_partitions() {
        let (db, _dir) = temp_db();
        db.insert_principal(Role::Client, &record("both@x.com")).unwrap();
        db.insert_principal(Role::Admin, &record("both@x.com")).unwrap();
    }

    #[test]
    fn unpinned_lookup_prefers_admin_partition() {
        let (db, _dir) = temp_db();
        let client = db.insert_principal(Role::Client, &record("both@x.com")).unwrap();
        let admin = db.insert_principal(Role::Admin, &record("both@x.com")).unwrap();

        let found = db.find_principal_by_email("both@x.com", None).unwrap().unwrap();
        assert_eq!(found.role(), Role::Admin);
        assert_eq!(found.id(), admin.id());

        let pinned = db
            .find_principal_by_email("both@x.com", Some(Role::Client))
            .unwrap()
            .unwrap();
        assert_eq!(pinned.id(), client.id());
    }

    #[test]
    fn pinned_lookup_never_crosses_partitions() {
        let (db, _dir) = temp_db();
        db.insert_principal(Role::Client, &record("only-client@x.com"))
            .unwrap();

        assert!(db
            .find_principal_by_email("only-client@x.com", Some(Role::Admin))
            .unwrap()
            .is_none());
        assert!(db
            .find_principal_by_email("missing@x.com", None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn update_profile_persists_patch() {
        let (db, _dir) = temp_db();
        let p = db.insert_principal(Role::Client, &record("p@x.com")).unwrap();

        let updated = db
            .update_profile(
                Role::Client,
                p.id(),
                ProfilePatch {
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.record().name, "Renamed");
        assert_eq!(updated.record().email, "p@x.com");

        let missing = db.update_profile(Role::Client, "nope", ProfilePatch::default());
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn change_password_revokes_sessions() {
        use crate::storage::ClientMetadata;
        use chrono::{Duration, Utc};

        let (db, _dir) = temp_db();
        let p = db.insert_principal(Role::Client, &record("c@x.com")).unwrap();
        let now = Utc::now();
        for token in ["t1", "t2"] {
            db.record_session(
                token,
                p.id(),
                Role::Client,
                now,
                now + Duration::hours(2),
                ClientMetadata::default(),
            )
            .unwrap();
        }

        let revoked = db
            .change_password_and_revoke(Role::Client, p.id(), "$2b$10$new")
            .unwrap();
        assert_eq!(revoked, 2);

        let reloaded = db.find_principal_by_id(Role::Client, p.id()).unwrap().unwrap();
        assert_eq!(reloaded.record().password_hash, "$2b$10$new");
        assert!(db.list_sessions_for(p.id(), Role::Client).unwrap().is_empty());
    }
}
