//! Client configuration.
//!
//! Layering: built-in defaults, then the TOML config file, then
//! `GOPHKEEPER_*` environment variables, then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_address: String,
    pub storage_path: PathBuf,
    /// Run a best-effort sync after mutating commands.
    pub auto_sync: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let storage_path = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".gophkeeper"))
            .unwrap_or_else(|| PathBuf::from(".gophkeeper"));

        Self {
            server_address: "http://127.0.0.1:50051".to_string(),
            storage_path,
            auto_sync: false,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `GOPHKEEPER_*` environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("GOPHKEEPER_SERVER_ADDRESS") {
            self.server_address = v;
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_STORAGE_PATH") {
            self.storage_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_AUTO_SYNC") {
            self.auto_sync = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: ClientConfig = toml::from_str("auto_sync = true").unwrap();
        assert!(cfg.auto_sync);
        assert_eq!(cfg.server_address, "http://127.0.0.1:50051");
    }
}
