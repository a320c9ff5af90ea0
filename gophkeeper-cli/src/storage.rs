//! Durable local store: `session.json` and `secrets.json` in the storage
//! directory.
//!
//! Both files are rewritten wholesale on every mutation through a
//! write-then-rename so a crash never leaves a half-written file. One
//! client instance per storage directory; concurrent instances degrade to
//! last-writer-wins.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{SecretData, Session};
use crate::error::{ClientError, Result};

/// Seam between the client application and its persistence, so tests can
/// substitute an in-memory store.
pub trait LocalStore {
    fn get_session(&self) -> Result<Option<Session>>;
    fn save_session(&self, session: &Session) -> Result<()>;
    fn delete_session(&self) -> Result<()>;

    fn get_secrets(&self) -> Result<Vec<SecretData>>;
    fn get_secret(&self, id: &str) -> Result<Option<SecretData>>;
    fn save_secret(&self, secret: &SecretData) -> Result<()>;
    fn delete_secret(&self, id: &str) -> Result<()>;
}

pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    pub fn open(base_path: &Path) -> Result<Self> {
        fs::create_dir_all(base_path).map_err(|e| ClientError::Storage(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(base_path, fs::Permissions::from_mode(0o700))
                .map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        Ok(Self {
            base_path: base_path.to_path_buf(),
        })
    }

    fn session_path(&self) -> PathBuf {
        self.base_path.join("session.json")
    }

    fn secrets_path(&self) -> PathBuf {
        self.base_path.join("secrets.json")
    }

    /// Write the new content next to the target, then rename over it.
    fn write_atomic(&self, path: &Path, content: &[u8]) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| ClientError::Storage(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        fs::rename(&tmp, path).map_err(|e| ClientError::Storage(e.to_string()))
    }

    fn write_secrets(&self, secrets: &[SecretData]) -> Result<()> {
        let content = serde_json::to_vec_pretty(secrets)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.write_atomic(&self.secrets_path(), &content)
    }
}

impl LocalStore for FileStorage {
    fn get_session(&self) -> Result<Option<Session>> {
        match fs::read(self.session_path()) {
            Ok(content) => serde_json::from_slice(&content)
                .map(Some)
                .map_err(|e| ClientError::Storage(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        let content = serde_json::to_vec_pretty(session)
            .map_err(|e| ClientError::Storage(e.to_string()))?;
        self.write_atomic(&self.session_path(), &content)
    }

    fn delete_session(&self) -> Result<()> {
        match fs::remove_file(self.session_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    fn get_secrets(&self) -> Result<Vec<SecretData>> {
        match fs::read(self.secrets_path()) {
            Ok(content) => serde_json::from_slice(&content)
                .map_err(|e| ClientError::Storage(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }

    fn get_secret(&self, id: &str) -> Result<Option<SecretData>> {
        Ok(self.get_secrets()?.into_iter().find(|s| s.id == id))
    }

    fn save_secret(&self, secret: &SecretData) -> Result<()> {
        let mut secrets = self.get_secrets()?;
        match secrets.iter_mut().find(|s| s.id == secret.id) {
            Some(existing) => *existing = secret.clone(),
            None => secrets.push(secret.clone()),
        }
        self.write_secrets(&secrets)
    }

    fn delete_secret(&self, id: &str) -> Result<()> {
        let mut secrets = self.get_secrets()?;
        secrets.retain(|s| s.id != id);
        self.write_secrets(&secrets)
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub struct MemoryStore {
    session: std::sync::Mutex<Option<Session>>,
    secrets: std::sync::Mutex<Vec<SecretData>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self {
            session: std::sync::Mutex::new(None),
            secrets: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl LocalStore for MemoryStore {
    fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.session.lock().unwrap().clone())
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn delete_session(&self) -> Result<()> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    fn get_secrets(&self) -> Result<Vec<SecretData>> {
        Ok(self.secrets.lock().unwrap().clone())
    }

    fn get_secret(&self, id: &str) -> Result<Option<SecretData>> {
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    fn save_secret(&self, secret: &SecretData) -> Result<()> {
        let mut secrets = self.secrets.lock().unwrap();
        match secrets.iter_mut().find(|s| s.id == secret.id) {
            Some(existing) => *existing = secret.clone(),
            None => secrets.push(secret.clone()),
        }
        Ok(())
    }

    fn delete_secret(&self, id: &str) -> Result<()> {
        self.secrets.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }
}
