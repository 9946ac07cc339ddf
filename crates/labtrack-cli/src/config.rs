//! CLI configuration.

use anyhow::{bail, Result};
use std::path::PathBuf;

/// Which store adapter the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Durable single-file store
    Sqlite,
    /// Ephemeral in-process store
    Memory,
}

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Store adapter to use
    pub store: StoreKind,

    /// Database path (for sqlite)
    pub db_path: PathBuf,

    /// Identity recorded on mutating operations
    pub user: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::Sqlite,
            db_path: PathBuf::from("./labtrack.db"),
            user: "operator".to_string(),
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LABTRACK_STORE`: "sqlite" (default) or "memory"
    /// - `LABTRACK_DB_PATH`: database path for the sqlite store
    /// - `LABTRACK_USER`: identity recorded on mutating operations
    ///
    /// # Errors
    ///
    /// Returns error on an unsupported `LABTRACK_STORE` value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(kind) = std::env::var("LABTRACK_STORE") {
            config.store = match kind.as_str() {
                "sqlite" => StoreKind::Sqlite,
                "memory" => StoreKind::Memory,
                other => bail!("unsupported LABTRACK_STORE: {other}"),
            };
        }

        if let Ok(path) = std::env::var("LABTRACK_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(user) = std::env::var("LABTRACK_USER") {
            config.user = user;
        }

        Ok(config)
    }
}
