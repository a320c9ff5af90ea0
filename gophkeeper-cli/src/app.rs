//! Client application: session lifecycle, local edits, and the sync
//! driver.
//!
//! Secrets are edited locally and marked dirty; `sync` encrypts the dirty
//! set under the session key, reconciles with the server, and applies the
//! downloaded changes. The server is authoritative on existence: a
//! downloaded tombstone removes the local record regardless of dirtiness.

use gophkeeper_core::api::Secret;
use gophkeeper_core::{AeadCipher, DataKey, SecretType};

use crate::domain::{SecretData, SecretPayload, Session};
use crate::error::{ClientError, Result};
use crate::storage::LocalStore;
use crate::transport::Api;

/// What to do with a secret whose local and server versions diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResolution {
    /// Adopt the server copy and clear the dirty flag.
    Server,
    /// Keep the local copy; it stays dirty so the next sync retries.
    Local,
}

/// Outcome of one sync round, as shown to the user.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub uploaded: usize,
    pub downloaded: usize,
    pub conflicts: Vec<String>,
}

pub struct Client<A: Api, S: LocalStore> {
    transport: A,
    store: S,
}

impl<A: Api, S: LocalStore> Client<A, S> {
    pub fn new(transport: A, store: S) -> Self {
        Self { transport, store }
    }

    /// Register a new account and start a fresh session for it.
    ///
    /// The data-encryption key is generated here and never leaves the
    /// local store.
    pub async fn register(&mut self, login: &str, password: &str) -> Result<String> {
        let user_id = self.transport.register(login, password).await?;

        let session = Session {
            user_id: user_id.clone(),
            login: login.to_string(),
            access_token: String::new(),
            refresh_token: String::new(),
            encryption_key: DataKey::generate().as_bytes().to_vec(),
            last_sync: chrono::Utc::now().timestamp(),
            last_sync_version: 0,
        };
        self.store.save_session(&session)?;

        Ok(user_id)
    }

    /// Authenticate and persist the token pair.
    ///
    /// An existing session keeps its encryption key; without one a fresh
    /// key is generated.
    pub async fn login(&mut self, login: &str, password: &str) -> Result<()> {
        let response = self.transport.login(login, password).await?;

        let mut session = match self.store.get_session()? {
            Some(session) => session,
            None => Session {
                user_id: response.user_id.clone(),
                login: login.to_string(),
                access_token: String::new(),
                refresh_token: String::new(),
                encryption_key: DataKey::generate().as_bytes().to_vec(),
                last_sync: 0,
                last_sync_version: 0,
            },
        };

        session.user_id = response.user_id;
        session.login = login.to_string();
        session.access_token = response.access_token;
        session.refresh_token = response.refresh_token;
        self.store.save_session(&session)?;

        self.transport.set_token(&session.access_token);
        Ok(())
    }

    /// End the session. Server failure is tolerated; local tokens are
    /// wiped either way.
    pub async fn logout(&mut self) -> Result<()> {
        let session = self.store.get_session()?.ok_or(ClientError::NotAuthenticated)?;

        if let Err(e) = self.transport.logout(&session.refresh_token).await {
            tracing::warn!("logout call failed: {e}");
        }

        self.store.delete_session()?;
        self.transport.set_token("");
        Ok(())
    }

    pub fn session(&self) -> Result<Option<Session>> {
        self.store.get_session()
    }

    /// Create a secret locally, marked dirty for the next sync.
    pub fn create_secret(&mut self, name: &str, payload: SecretPayload) -> Result<String> {
        let session = self.ensure_authenticated()?;
        let secret = SecretData::new(&session.user_id, name, payload);
        self.store.save_secret(&secret)?;
        Ok(secret.id)
    }

    pub fn get_secret(&self, id: &str) -> Result<SecretData> {
        self.store
            .get_secret(id)?
            .filter(|s| !s.is_deleted)
            .ok_or_else(|| ClientError::SecretNotFound(id.to_string()))
    }

    pub fn list_secrets(&self, filter_type: Option<SecretType>) -> Result<Vec<SecretData>> {
        let secrets = self
            .store
            .get_secrets()?
            .into_iter()
            .filter(|s| !s.is_deleted)
            .filter(|s| filter_type.map_or(true, |t| s.secret_type == t))
            .collect();
        Ok(secrets)
    }

    /// Tombstone a secret locally; sync propagates the deletion.
    pub fn delete_secret(&mut self, id: &str) -> Result<()> {
        let mut secret = self
            .store
            .get_secret(id)?
            .ok_or_else(|| ClientError::SecretNotFound(id.to_string()))?;

        secret.is_deleted = true;
        secret.is_dirty = true;
        secret.updated_at = chrono::Utc::now().timestamp();
        self.store.save_secret(&secret)
    }

    /// Fetch and decrypt a single secret straight from the server.
    pub async fn get_secret_remote(&mut self, id: &str) -> Result<SecretData> {
        let session = self.ensure_authenticated()?;
        let first = self.transport.get_secret(id).await;
        let wire = match first {
            Err(e) if e.is_unauthenticated() => {
                let session = self.refresh_session().await?;
                let wire = self.transport.get_secret(id).await?;
                return decrypt_secret(&session, &wire);
            }
            other => other?,
        };
        decrypt_secret(&session, &wire)
    }

    /// Fetch and decrypt the user's live secrets from the server.
    pub async fn list_secrets_remote(
        &mut self,
        filter_type: Option<SecretType>,
    ) -> Result<Vec<SecretData>> {
        let session = self.ensure_authenticated()?;
        let first = self
            .transport
            .list_secrets(&session.user_id, filter_type)
            .await;
        let wires = match first {
            Err(e) if e.is_unauthenticated() => {
                self.refresh_session().await?;
                self.transport
                    .list_secrets(&session.user_id, filter_type)
                    .await?
            }
            other => other?,
        };

        let session = self.ensure_authenticated()?;
        let mut out = Vec::with_capacity(wires.len());
        for wire in &wires {
            match decrypt_secret(&session, wire) {
                Ok(secret) => out.push(secret),
                Err(e) => tracing::warn!("failed to decrypt secret {}: {e}", wire.id),
            }
        }
        Ok(out)
    }

    /// Delete on the server immediately, then drop the local copy.
    pub async fn delete_secret_remote(&mut self, id: &str) -> Result<()> {
        self.ensure_authenticated()?;
        let first = self.transport.delete_secret(id).await;
        match first {
            Err(e) if e.is_unauthenticated() => {
                self.refresh_session().await?;
                self.transport.delete_secret(id).await?;
            }
            other => {
                other?;
            }
        }
        self.store.delete_secret(id)
    }

    /// One bidirectional sync round.
    ///
    /// Uploads the dirty set (or everything with `force`), applies the
    /// server's changed rows, and advances the version cursor.
    pub async fn sync(&mut self, force: bool, resolve: ConflictResolution) -> Result<SyncReport> {
        let mut session = self.ensure_authenticated()?;

        let locals = self.store.get_secrets()?;
        let mut upload = Vec::new();
        for local in &locals {
            if local.is_dirty || force {
                upload.push(encrypt_secret(&session, local)?);
            }
        }
        let uploaded = upload.len();

        let first = self
            .transport
            .sync(&session.user_id, session.last_sync_version, upload.clone())
            .await;
        let response = match first {
            Err(e) if e.is_unauthenticated() => {
                session = self.refresh_session().await?;
                self.transport
                    .sync(&session.user_id, session.last_sync_version, upload)
                    .await?
            }
            other => other?,
        };

        let mut downloaded = 0;
        let mut conflicts = Vec::new();

        for wire in &response.secrets {
            if wire.is_deleted {
                // The server is authoritative on existence.
                self.store.delete_secret(&wire.id)?;
                continue;
            }

            let incoming = match decrypt_secret(&session, wire) {
                Ok(secret) => secret,
                Err(e) => {
                    tracing::warn!("failed to decrypt secret {}: {e}", wire.id);
                    continue;
                }
            };

            match self.store.get_secret(&incoming.id)? {
                Some(local) if local.version != incoming.version => {
                    conflicts.push(format!(
                        "{}: version conflict (local={}, server={})",
                        incoming.id, local.version, incoming.version
                    ));
                    if resolve == ConflictResolution::Server {
                        self.store.save_secret(&incoming)?;
                        downloaded += 1;
                    }
                }
                _ => {
                    self.store.save_secret(&incoming)?;
                    downloaded += 1;
                }
            }
        }

        session.last_sync = chrono::Utc::now().timestamp();
        session.last_sync_version = response.current_version;
        self.store.save_session(&session)?;

        Ok(SyncReport {
            uploaded,
            downloaded,
            conflicts,
        })
    }

    fn ensure_authenticated(&mut self) -> Result<Session> {
        let session = self.store.get_session()?.ok_or(ClientError::NotAuthenticated)?;
        if session.access_token.is_empty() {
            return Err(ClientError::NotAuthenticated);
        }
        self.transport.set_token(&session.access_token);
        Ok(session)
    }

    /// Rotate the token pair once and retry; called on an UNAUTHENTICATED
    /// response.
    async fn refresh_session(&mut self) -> Result<Session> {
        let mut session = self.store.get_session()?.ok_or(ClientError::NotAuthenticated)?;

        let pair = self.transport.refresh_token(&session.refresh_token).await?;
        session.access_token = pair.access_token;
        session.refresh_token = pair.refresh_token;
        self.store.save_session(&session)?;

        self.transport.set_token(&session.access_token);
        Ok(session)
    }
}

fn session_cipher(session: &Session) -> Result<AeadCipher> {
    Ok(AeadCipher::new(&session.encryption_key)?)
}

/// JSON-encode the typed payload and seal it under the session key.
fn encrypt_secret(session: &Session, secret: &SecretData) -> Result<Secret> {
    let plaintext = secret.data.to_wire_json()?;
    let encrypted_data = session_cipher(session)?.encrypt(&plaintext)?;

    Ok(Secret {
        id: secret.id.clone(),
        user_id: secret.user_id.clone(),
        secret_type: secret.secret_type,
        name: secret.name.clone(),
        encrypted_data,
        encrypted_meta: Vec::new(),
        version: secret.version,
        created_at: secret.created_at,
        updated_at: secret.updated_at,
        is_deleted: secret.is_deleted,
    })
}

/// Open a server envelope and decode the typed payload.
fn decrypt_secret(session: &Session, wire: &Secret) -> Result<SecretData> {
    let plaintext = session_cipher(session)?.decrypt(&wire.encrypted_data)?;
    let data = SecretPayload::from_wire_json(wire.secret_type, &plaintext)?;

    Ok(SecretData {
        id: wire.id.clone(),
        user_id: wire.user_id.clone(),
        secret_type: wire.secret_type,
        name: wire.name.clone(),
        data,
        version: wire.version,
        created_at: wire.created_at,
        updated_at: wire.updated_at,
        is_dirty: false,
        is_deleted: wire.is_deleted,
    })
}
