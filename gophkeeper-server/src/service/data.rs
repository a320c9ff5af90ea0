//! Per-user secret management and sync reconciliation.
//!
//! Every operation takes the authenticated user id as an ambient
//! capability; a payload naming a different owner is rejected before any
//! store call.

use chrono::Utc;
use gophkeeper_core::api::Secret;
use gophkeeper_core::{new_id, DomainError, SecretType, ValidationError};

use crate::storage::Storage;

const MAX_ENCRYPTED_DATA_BYTES: usize = 10 * 1024 * 1024;

/// Outcome of one sync round.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Version cursor snapshotted before the client's writes; the client
    /// adopts it for the next round.
    pub current_version: i64,
    pub server_secrets: Vec<Secret>,
    /// Ids of client secrets that lost the per-secret version check.
    pub conflicts: Vec<String>,
}

pub struct DataService {
    storage: Storage,
}

impl DataService {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create a secret, assigning id, owner, version 1 and timestamps
    /// server-side.
    pub fn create_secret(&self, user_id: &str, mut secret: Secret) -> Result<Secret, DomainError> {
        let now = Utc::now().timestamp();
        secret.id = new_id();
        secret.user_id = user_id.to_string();
        secret.version = 1;
        secret.created_at = now;
        secret.updated_at = now;
        secret.is_deleted = false;

        validate_secret(&secret)?;
        self.storage.create_secret(&secret)?;
        Ok(secret)
    }

    pub fn get_secret(&self, user_id: &str, secret_id: &str) -> Result<Secret, DomainError> {
        self.storage.get_secret(secret_id, user_id)
    }

    pub fn list_secrets(
        &self,
        user_id: &str,
        filter_type: Option<SecretType>,
    ) -> Result<Vec<Secret>, DomainError> {
        self.storage.list_secrets(user_id, filter_type)
    }

    /// Update an existing secret under optimistic concurrency.
    pub fn update_secret(&self, user_id: &str, mut secret: Secret) -> Result<Secret, DomainError> {
        if !secret.user_id.is_empty() && secret.user_id != user_id {
            return Err(DomainError::AccessDenied);
        }
        secret.user_id = user_id.to_string();

        let existing = self.storage.get_secret(&secret.id, user_id)?;
        if existing.version != secret.version {
            return Err(DomainError::VersionConflict);
        }

        secret.created_at = existing.created_at;
        secret.is_deleted = false;
        validate_secret(&secret)?;

        self.storage.update_secret(&secret)?;

        secret.version += 1;
        secret.updated_at = Utc::now().timestamp();
        Ok(secret)
    }

    pub fn delete_secret(&self, user_id: &str, secret_id: &str) -> Result<(), DomainError> {
        self.storage.soft_delete_secret(secret_id, user_id)
    }

    /// Reconcile a batch of client edits against the store and collect the
    /// rows the client has not seen yet.
    ///
    /// The loop is deliberately not one transaction: each per-secret
    /// mutation is an independent atomic conditional write, and failures
    /// are reported through `conflicts` instead of aborting the round.
    pub fn sync(
        &self,
        user_id: &str,
        client_secrets: Vec<Secret>,
        last_sync_version: i64,
    ) -> Result<SyncOutcome, DomainError> {
        for secret in &client_secrets {
            if secret.user_id != user_id {
                return Err(DomainError::AccessDenied);
            }
        }

        let current_version = self.storage.user_secrets_version(user_id)?;
        let server_secrets = self.storage.changed_secrets(user_id, last_sync_version)?;
        let conflicts = self.process_client_changes(user_id, client_secrets)?;

        Ok(SyncOutcome {
            current_version,
            server_secrets,
            conflicts,
        })
    }

    fn process_client_changes(
        &self,
        user_id: &str,
        client_secrets: Vec<Secret>,
    ) -> Result<Vec<String>, DomainError> {
        let mut conflicts = Vec::new();
        let now = Utc::now().timestamp();

        for mut secret in client_secrets {
            if secret.is_deleted {
                match self.storage.soft_delete_secret(&secret.id, user_id) {
                    // Already gone on the server: nothing to propagate.
                    Ok(()) | Err(DomainError::SecretNotFound) => {}
                    Err(_) => conflicts.push(secret.id),
                }
                continue;
            }

            let existing = match self.storage.get_secret(&secret.id, user_id) {
                Ok(existing) => Some(existing),
                Err(DomainError::SecretNotFound) => None,
                Err(_) => {
                    conflicts.push(secret.id);
                    continue;
                }
            };

            match existing {
                None => {
                    secret.version = 1;
                    secret.created_at = now;
                    secret.updated_at = now;
                    if self.storage.create_secret(&secret).is_err() {
                        conflicts.push(secret.id);
                    }
                }
                Some(existing) if existing.version != secret.version => {
                    conflicts.push(secret.id);
                }
                Some(existing) => {
                    secret.version = existing.version;
                    secret.updated_at = now;
                    if self.storage.update_secret(&secret).is_err() {
                        conflicts.push(secret.id);
                    }
                }
            }
        }

        Ok(conflicts)
    }
}

fn validate_secret(secret: &Secret) -> Result<(), DomainError> {
    if secret.user_id.is_empty() {
        return Err(DomainError::InvalidSecret(ValidationError::new(
            "user_id",
            "is required",
        )));
    }
    if secret.name.is_empty() {
        return Err(DomainError::InvalidSecret(ValidationError::new(
            "name",
            "is required",
        )));
    }
    if secret.encrypted_data.is_empty() {
        return Err(DomainError::InvalidSecret(ValidationError::new(
            "encrypted_data",
            "is required",
        )));
    }
    if secret.encrypted_data.len() > MAX_ENCRYPTED_DATA_BYTES {
        return Err(DomainError::InvalidSecret(ValidationError::new(
            "encrypted_data",
            "too large",
        )));
    }
    match secret.secret_type {
        SecretType::LoginPassword | SecretType::Text | SecretType::Binary | SecretType::BankCard => {
            Ok(())
        }
        SecretType::Unspecified => Err(DomainError::InvalidSecretType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::User;

    fn service_with_user(user_id: &str) -> DataService {
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
        DataService::new(storage)
    }

    fn draft(name: &str) -> Secret {
        Secret {
            id: String::new(),
            user_id: String::new(),
            secret_type: SecretType::LoginPassword,
            name: name.to_string(),
            encrypted_data: vec![0xAB; 32],
            encrypted_meta: Vec::new(),
            version: 0,
            created_at: 0,
            updated_at: 0,
            is_deleted: false,
        }
    }

    fn client_secret(id: &str, user_id: &str, name: &str, version: i64) -> Secret {
        Secret {
            id: id.to_string(),
            user_id: user_id.to_string(),
            secret_type: SecretType::LoginPassword,
            name: name.to_string(),
            encrypted_data: vec![0xCD; 32],
            encrypted_meta: Vec::new(),
            version,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            is_deleted: false,
        }
    }

    #[test]
    fn create_assigns_identity_and_version() {
        let svc = service_with_user("u1");
        let created = svc.create_secret("u1", draft("gmail")).unwrap();

        assert!(!created.id.is_empty());
        assert_eq!(created.user_id, "u1");
        assert_eq!(created.version, 1);
        assert!(!created.is_deleted);
    }

    #[test]
    fn create_validates_shape() {
        let svc = service_with_user("u1");

        let mut no_name = draft("");
        no_name.name.clear();
        assert!(matches!(
            svc.create_secret("u1", no_name),
            Err(DomainError::InvalidSecret(_))
        ));

        let mut empty_data = draft("gmail");
        empty_data.encrypted_data.clear();
        assert!(matches!(
            svc.create_secret("u1", empty_data),
            Err(DomainError::InvalidSecret(_))
        ));

        let mut oversized = draft("gmail");
        oversized.encrypted_data = vec![0u8; MAX_ENCRYPTED_DATA_BYTES + 1];
        assert!(matches!(
            svc.create_secret("u1", oversized),
            Err(DomainError::InvalidSecret(_))
        ));

        let mut untyped = draft("gmail");
        untyped.secret_type = SecretType::Unspecified;
        assert!(matches!(
            svc.create_secret("u1", untyped),
            Err(DomainError::InvalidSecretType)
        ));
    }

    #[test]
    fn update_enforces_version_and_ownership() {
        let svc = service_with_user("u1");
        let created = svc.create_secret("u1", draft("gmail")).unwrap();

        let mut stale = created.clone();
        stale.version = 99;
        assert!(matches!(
            svc.update_secret("u1", stale),
            Err(DomainError::VersionConflict)
        ));

        let mut foreign = created.clone();
        foreign.user_id = "u2".to_string();
        assert!(matches!(
            svc.update_secret("u1", foreign),
            Err(DomainError::AccessDenied)
        ));

        let mut edit = created.clone();
        edit.name = "gmail2".to_string();
        let updated = svc.update_secret("u1", edit).unwrap();
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn sync_uploads_new_secret_and_advances_cursor() {
        let svc = service_with_user("u1");

        let outcome = svc
            .sync("u1", vec![client_secret("s1", "u1", "gmail", 1)], 0)
            .unwrap();
        // Snapshot taken before the client's write.
        assert_eq!(outcome.current_version, 0);
        assert!(outcome.conflicts.is_empty());

        // Next round with the advanced cursor is empty.
        let outcome = svc.sync("u1", Vec::new(), 1).unwrap();
        assert_eq!(outcome.current_version, 1);
        assert!(outcome.server_secrets.is_empty());
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn sync_is_idempotent_for_a_fixed_cursor() {
        let svc = service_with_user("u1");
        svc.sync("u1", vec![client_secret("s1", "u1", "gmail", 1)], 0)
            .unwrap();

        let first = svc.sync("u1", Vec::new(), 0).unwrap();
        let second = svc.sync("u1", Vec::new(), 0).unwrap();

        let ids = |o: &SyncOutcome| {
            o.server_secrets
                .iter()
                .map(|s| (s.id.clone(), s.version))
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn sync_rejects_foreign_payload_outright() {
        let svc = service_with_user("u1");
        assert!(matches!(
            svc.sync("u1", vec![client_secret("s1", "u2", "gmail", 1)], 0),
            Err(DomainError::AccessDenied)
        ));
    }

    #[test]
    fn concurrent_edit_is_reported_not_merged() {
        let svc = service_with_user("u1");

        // Device B created the secret and then edited it to version 2.
        svc.sync("u1", vec![client_secret("s1", "u1", "gmail", 1)], 0)
            .unwrap();
        svc.sync("u1", vec![client_secret("s1", "u1", "work", 1)], 1)
            .unwrap();

        // Device A still holds version 1 with its own edit.
        let outcome = svc
            .sync("u1", vec![client_secret("s1", "u1", "gmail2", 1)], 1)
            .unwrap();

        assert_eq!(outcome.conflicts, vec!["s1".to_string()]);
        // Server kept device B's write.
        let stored = svc.get_secret("u1", "s1").unwrap();
        assert_eq!(stored.name, "work");
        assert_eq!(stored.version, 2);
        // Device A's download contains the winning row.
        assert_eq!(outcome.server_secrets.len(), 1);
        assert_eq!(outcome.server_secrets[0].name, "work");
    }

    #[test]
    fn client_tombstone_deletes_on_server() {
        let svc = service_with_user("u1");
        svc.sync("u1", vec![client_secret("s1", "u1", "gmail", 1)], 0)
            .unwrap();

        let mut tombstone = client_secret("s1", "u1", "gmail", 1);
        tombstone.is_deleted = true;
        let outcome = svc.sync("u1", vec![tombstone], 1).unwrap();
        assert!(outcome.conflicts.is_empty());

        // Peer with the old cursor receives the tombstone.
        let outcome = svc.sync("u1", Vec::new(), 1).unwrap();
        assert_eq!(outcome.server_secrets.len(), 1);
        assert!(outcome.server_secrets[0].is_deleted);
    }

    #[test]
    fn deleting_an_unknown_secret_is_silently_ignored() {
        let svc = service_with_user("u1");
        let mut tombstone = client_secret("ghost", "u1", "x", 1);
        tombstone.is_deleted = true;

        let outcome = svc.sync("u1", vec![tombstone], 0).unwrap();
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn matching_version_upload_updates_in_place() {
        let svc = service_with_user("u1");
        svc.sync("u1", vec![client_secret("s1", "u1", "gmail", 1)], 0)
            .unwrap();

        let outcome = svc
            .sync("u1", vec![client_secret("s1", "u1", "gmail2", 1)], 1)
            .unwrap();
        assert!(outcome.conflicts.is_empty());

        let stored = svc.get_secret("u1", "s1").unwrap();
        assert_eq!(stored.name, "gmail2");
        assert_eq!(stored.version, 2);
    }
}
