//! Versioned secret store with optimistic concurrency and soft-delete.
//!
//! Every mutation bumps the per-row `version`; tombstoned rows stay in
//! place so the changed-since scan can replicate deletions to other
//! devices. Correctness under concurrency comes from the single-row
//! conditional UPDATE, not from any per-user lock.

use super::Storage;
use chrono::Utc;
use gophkeeper_core::api::Secret;
use gophkeeper_core::{DomainError, SecretType};
use rusqlite::OptionalExtension;

impl Storage {
    /// Insert a new secret row. A duplicate `(id, user_id)` pair yields
    /// `SecretAlreadyExists`.
    pub fn create_secret(&self, secret: &Secret) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO secrets (id, user_id, type, name, encrypted_data, encrypted_meta,
                                  version, created_at, updated_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                secret.id,
                secret.user_id,
                secret.secret_type.as_str(),
                secret.name,
                secret.encrypted_data,
                secret.encrypted_meta,
                secret.version,
                secret.created_at,
                secret.updated_at,
                secret.is_deleted,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Err(DomainError::SecretAlreadyExists)
            }
            Err(e) => Err(DomainError::Storage(e.to_string())),
        }
    }

    /// Fetch a live secret owned by `user_id`.
    ///
    /// The `user_id` filter is an access-control gate: another user's row
    /// is indistinguishable from a missing one.
    pub fn get_secret(&self, id: &str, user_id: &str) -> Result<Secret, DomainError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, user_id, type, name, encrypted_data, encrypted_meta,
                    version, created_at, updated_at, is_deleted
             FROM secrets
             WHERE id = ?1 AND user_id = ?2 AND is_deleted = 0",
            [id, user_id],
            Self::map_secret,
        )
        .optional()
        .map_err(|e| DomainError::Storage(e.to_string()))?
        .ok_or(DomainError::SecretNotFound)
    }

    /// All live secrets of a user, newest first.
    pub fn list_secrets(
        &self,
        user_id: &str,
        filter_type: Option<SecretType>,
    ) -> Result<Vec<Secret>, DomainError> {
        let conn = self.conn()?;
        let mut out = Vec::new();

        match filter_type {
            Some(t) => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, user_id, type, name, encrypted_data, encrypted_meta,
                                version, created_at, updated_at, is_deleted
                         FROM secrets
                         WHERE user_id = ?1 AND type = ?2 AND is_deleted = 0
                         ORDER BY created_at DESC",
                    )
                    .map_err(|e| DomainError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map([user_id, t.as_str()], Self::map_secret)
                    .map_err(|e| DomainError::Storage(e.to_string()))?;
                for row in rows {
                    out.push(row.map_err(|e| DomainError::Storage(e.to_string()))?);
                }
            }
            None => {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, user_id, type, name, encrypted_data, encrypted_meta,
                                version, created_at, updated_at, is_deleted
                         FROM secrets
                         WHERE user_id = ?1 AND is_deleted = 0
                         ORDER BY created_at DESC",
                    )
                    .map_err(|e| DomainError::Storage(e.to_string()))?;
                let rows = stmt
                    .query_map([user_id], Self::map_secret)
                    .map_err(|e| DomainError::Storage(e.to_string()))?;
                for row in rows {
                    out.push(row.map_err(|e| DomainError::Storage(e.to_string()))?);
                }
            }
        }

        Ok(out)
    }

    /// Conditional update keyed on `(id, user_id, version)`.
    ///
    /// On success the stored version is bumped past `secret.version`. Zero
    /// affected rows are disambiguated by re-reading the row: a different
    /// stored version means `VersionConflict`, anything else
    /// `SecretNotFound`.
    pub fn update_secret(&self, secret: &Secret) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE secrets
                 SET type = ?1, name = ?2, encrypted_data = ?3, encrypted_meta = ?4,
                     version = version + 1, updated_at = ?5, is_deleted = ?6
                 WHERE id = ?7 AND user_id = ?8 AND version = ?9",
                rusqlite::params![
                    secret.secret_type.as_str(),
                    secret.name,
                    secret.encrypted_data,
                    secret.encrypted_meta,
                    now,
                    secret.is_deleted,
                    secret.id,
                    secret.user_id,
                    secret.version,
                ],
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        if affected == 0 {
            let stored: Option<i64> = conn
                .query_row(
                    "SELECT version FROM secrets WHERE id = ?1 AND user_id = ?2",
                    [&secret.id, &secret.user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| DomainError::Storage(e.to_string()))?;

            return match stored {
                Some(version) if version != secret.version => Err(DomainError::VersionConflict),
                _ => Err(DomainError::SecretNotFound),
            };
        }

        Ok(())
    }

    /// Tombstone a live secret, bumping its version so peers observe the
    /// deletion on their next changed-since scan. Tombstoned is terminal.
    pub fn soft_delete_secret(&self, id: &str, user_id: &str) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let now = Utc::now().timestamp();

        let affected = conn
            .execute(
                "UPDATE secrets
                 SET is_deleted = 1, version = version + 1, updated_at = ?1
                 WHERE id = ?2 AND user_id = ?3 AND is_deleted = 0",
                rusqlite::params![now, id, user_id],
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(DomainError::SecretNotFound);
        }
        Ok(())
    }

    /// Hard delete, bypassing the tombstone machinery. Test helper only;
    /// the sync contract never removes rows.
    #[cfg(test)]
    pub fn delete_secret(&self, id: &str, user_id: &str) -> Result<(), DomainError> {
        let conn = self.conn()?;
        let affected = conn
            .execute(
                "DELETE FROM secrets WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(DomainError::SecretNotFound);
        }
        Ok(())
    }

    /// The user's version cursor: `MAX(version)` over every row,
    /// tombstones included; 0 for a user without secrets.
    pub fn user_secrets_version(&self, user_id: &str) -> Result<i64, DomainError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM secrets WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .map_err(|e| DomainError::Storage(e.to_string()))
    }

    /// All rows with `version > since`, tombstones included, in ascending
    /// version order. The ordering is total per user.
    pub fn changed_secrets(&self, user_id: &str, since: i64) -> Result<Vec<Secret>, DomainError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, type, name, encrypted_data, encrypted_meta,
                        version, created_at, updated_at, is_deleted
                 FROM secrets
                 WHERE user_id = ?1 AND version > ?2
                 ORDER BY version ASC",
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map(rusqlite::params![user_id, since], Self::map_secret)
            .map_err(|e| DomainError::Storage(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| DomainError::Storage(e.to_string()))?);
        }
        Ok(out)
    }

    fn map_secret(row: &rusqlite::Row<'_>) -> rusqlite::Result<Secret> {
        let type_str: String = row.get(2)?;
        let meta: Option<Vec<u8>> = row.get(5)?;
        Ok(Secret {
            id: row.get(0)?,
            user_id: row.get(1)?,
            secret_type: SecretType::parse(&type_str),
            name: row.get(3)?,
            encrypted_data: row.get(4)?,
            encrypted_meta: meta.unwrap_or_default(),
            version: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            is_deleted: row.get(9)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::User;

    fn storage_with_user(user_id: &str) -> Storage {
        let storage = Storage::in_memory().unwrap();
        storage
            .create_user(&User {
                id: user_id.to_string(),
                login: format!("login_{user_id}"),
                password_hash: "$2b$04$stub".to_string(),
                created_at: 1_700_000_000,
                updated_at: 1_700_000_000,
            })
            .unwrap();
        storage
    }

    fn secret(id: &str, user_id: &str, name: &str, created_at: i64) -> Secret {
        Secret {
            id: id.to_string(),
            user_id: user_id.to_string(),
            secret_type: SecretType::LoginPassword,
            name: name.to_string(),
            encrypted_data: vec![0xAA; 16],
            encrypted_meta: Vec::new(),
            version: 1,
            created_at,
            updated_at: created_at,
            is_deleted: false,
        }
    }

    #[test]
    fn create_and_get() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();

        let fetched = storage.get_secret("s1", "u1").unwrap();
        assert_eq!(fetched.name, "gmail");
        assert_eq!(fetched.version, 1);
    }

    #[test]
    fn duplicate_id_rejected() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();

        assert!(matches!(
            storage.create_secret(&secret("s1", "u1", "other", 200)),
            Err(DomainError::SecretAlreadyExists)
        ));
    }

    #[test]
    fn ownership_gate_returns_not_found() {
        let storage = storage_with_user("u1");
        storage
            .create_user(&User {
                id: "u2".to_string(),
                login: "login_u2".to_string(),
                password_hash: "$2b$04$stub".to_string(),
                created_at: 1_700_000_000,
                updated_at: 1_700_000_000,
            })
            .unwrap();
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();

        assert!(matches!(
            storage.get_secret("s1", "u2"),
            Err(DomainError::SecretNotFound)
        ));
    }

    #[test]
    fn update_bumps_version() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();

        let mut edit = secret("s1", "u1", "gmail2", 100);
        edit.version = 1;
        storage.update_secret(&edit).unwrap();

        let stored = storage.get_secret("s1", "u1").unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.name, "gmail2");
    }

    #[test]
    fn versions_strictly_increase_across_mutations() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();

        let mut observed = vec![storage.get_secret("s1", "u1").unwrap().version];
        for i in 0..3 {
            let mut edit = secret("s1", "u1", &format!("edit{i}"), 100);
            edit.version = observed[observed.len() - 1];
            storage.update_secret(&edit).unwrap();
            observed.push(storage.get_secret("s1", "u1").unwrap().version);
        }
        storage.soft_delete_secret("s1", "u1").unwrap();
        observed.push(storage.user_secrets_version("u1").unwrap());

        for pair in observed.windows(2) {
            assert!(pair[0] < pair[1], "versions not increasing: {observed:?}");
        }
    }

    #[test]
    fn stale_update_is_a_version_conflict() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();

        let mut edit = secret("s1", "u1", "gmail2", 100);
        edit.version = 1;
        storage.update_secret(&edit).unwrap();

        // Second writer still holds version 1.
        let mut stale = secret("s1", "u1", "work", 100);
        stale.version = 1;
        assert!(matches!(
            storage.update_secret(&stale),
            Err(DomainError::VersionConflict)
        ));
        assert_eq!(storage.get_secret("s1", "u1").unwrap().name, "gmail2");
    }

    #[test]
    fn update_of_missing_row_is_not_found() {
        let storage = storage_with_user("u1");
        let mut edit = secret("missing", "u1", "x", 100);
        edit.version = 1;
        assert!(matches!(
            storage.update_secret(&edit),
            Err(DomainError::SecretNotFound)
        ));
    }

    #[test]
    fn tombstone_hidden_from_get_but_visible_to_scan() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();
        storage.soft_delete_secret("s1", "u1").unwrap();

        assert!(matches!(
            storage.get_secret("s1", "u1"),
            Err(DomainError::SecretNotFound)
        ));
        assert!(storage.list_secrets("u1", None).unwrap().is_empty());

        let changed = storage.changed_secrets("u1", 1).unwrap();
        assert_eq!(changed.len(), 1);
        assert!(changed[0].is_deleted);
        assert_eq!(changed[0].version, 2);
    }

    #[test]
    fn soft_delete_is_terminal() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();
        storage.soft_delete_secret("s1", "u1").unwrap();

        assert!(matches!(
            storage.soft_delete_secret("s1", "u1"),
            Err(DomainError::SecretNotFound)
        ));
    }

    #[test]
    fn cursor_counts_tombstones() {
        let storage = storage_with_user("u1");
        assert_eq!(storage.user_secrets_version("u1").unwrap(), 0);

        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();
        assert_eq!(storage.user_secrets_version("u1").unwrap(), 1);

        storage.soft_delete_secret("s1", "u1").unwrap();
        assert_eq!(storage.user_secrets_version("u1").unwrap(), 2);
    }

    #[test]
    fn changed_scan_is_version_ordered_and_exclusive() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "a", 100)).unwrap();
        let mut edit = secret("s1", "u1", "b", 100);
        edit.version = 1;
        storage.update_secret(&edit).unwrap(); // s1 now at version 2
        storage.create_secret(&secret("s2", "u1", "c", 200)).unwrap(); // version 1

        let all = storage.changed_secrets("u1", 0).unwrap();
        let versions: Vec<i64> = all.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![1, 2]);

        // Cursor semantics: strictly greater than `since`.
        let after_one = storage.changed_secrets("u1", 1).unwrap();
        assert_eq!(after_one.len(), 1);
        assert_eq!(after_one[0].id, "s1");
        assert!(storage.changed_secrets("u1", 2).unwrap().is_empty());
    }

    #[test]
    fn list_orders_newest_first_and_filters_by_type() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "old", 100)).unwrap();
        storage.create_secret(&secret("s2", "u1", "new", 200)).unwrap();

        let mut card = secret("s3", "u1", "visa", 150);
        card.secret_type = SecretType::BankCard;
        storage.create_secret(&card).unwrap();

        let all = storage.list_secrets("u1", None).unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["new", "visa", "old"]);

        let cards = storage.list_secrets("u1", Some(SecretType::BankCard)).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, "s3");
    }

    #[test]
    fn hard_delete_removes_the_row() {
        let storage = storage_with_user("u1");
        storage.create_secret(&secret("s1", "u1", "gmail", 100)).unwrap();
        storage.delete_secret("s1", "u1").unwrap();

        assert!(storage.changed_secrets("u1", 0).unwrap().is_empty());
        assert!(matches!(
            storage.delete_secret("s1", "u1"),
            Err(DomainError::SecretNotFound)
        ));
    }
}
