//! Server configuration.
//!
//! Layering: built-in defaults, then the TOML config file, then
//! `GOPHKEEPER_*` environment variables, then command-line flags.

use gophkeeper_core::crypto::token::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:50051".to_string(),
            database_path: PathBuf::from("gophkeeper.db"),
            jwt_secret: "default-jwt-secret-key-change-in-production".to_string(),
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            // Single secrets are capped at 10 MiB; a sync batch may carry
            // several of them.
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `GOPHKEEPER_*` environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("GOPHKEEPER_LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_DATABASE_PATH") {
            self.database_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_JWT_SECRET") {
            self.jwt_secret = v;
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_JWT_ACCESS_TTL_SECS") {
            if let Ok(n) = v.parse() {
                self.access_ttl_secs = n;
            }
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_JWT_REFRESH_TTL_SECS") {
            if let Ok(n) = v.parse() {
                self.refresh_ttl_secs = n;
            }
        }
        if let Ok(v) = std::env::var("GOPHKEEPER_MAX_BODY_BYTES") {
            if let Ok(n) = v.parse() {
                self.max_body_bytes = n;
            }
        }
    }
}
