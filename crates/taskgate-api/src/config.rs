//! Server configuration.
//!
//! The server reads a YAML file such as:
//!
//! ```yaml
//! listen: 127.0.0.1:8080
//! page-size: 15
//! storage:
//!   backend: sqlite
//!   path: data/tasks.db
//! users:
//!   - name: Manager
//!     email: manager@example.com
//!     role: manager
//! ```
//!
//! Every key is optional. Seed users are registered at startup unless a user
//! with the same email already exists.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use taskgate::domain::{NewUser, Role, DEFAULT_PAGE_SIZE};
use taskgate::storage::StorageBackend;
use tokio::fs;

/// Address the server binds to when none is configured
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Configuration file structure for the API server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Socket address to listen on
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Tasks per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Users registered at startup
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

/// Storage configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Ephemeral in-memory store
    #[default]
    Memory,

    /// `SQLite` database file
    Sqlite {
        /// Path to the database file
        path: PathBuf,
    },
}

impl StorageConfig {
    /// The storage backend this section selects.
    #[must_use]
    pub fn backend(&self) -> StorageBackend {
        match self {
            StorageConfig::Memory => StorageBackend::InMemory,
            StorageConfig::Sqlite { path } => StorageBackend::Sqlite(path.clone()),
        }
    }
}

/// A user to register at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedUser {
    /// Display name
    pub name: String,

    /// Email address
    pub email: String,

    /// Role
    pub role: Role,

    /// Opaque credential hash
    #[serde(default, rename = "credential-hash")]
    pub credential_hash: String,
}

impl From<SeedUser> for NewUser {
    fn from(seed: SeedUser) -> Self {
        NewUser::new(seed.name, seed.email, seed.role).with_credential_hash(seed.credential_hash)
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            page_size: default_page_size(),
            storage: StorageConfig::default(),
            users: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`ApiConfig::validate`].
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unparsable listen address, a zero page
    /// size or a malformed seed user.
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if self.page_size == 0 {
            return Err(Error::Config("page-size must be at least 1".to_string()));
        }
        for user in &self.users {
            NewUser::from(user.clone())
                .validate()
                .map_err(|e| Error::Config(format!("seed user '{}': {e}", user.email)))?;
        }
        Ok(())
    }

    /// The listen address as a socket address.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `listen` is not a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address '{}': {e}", self.listen)))
    }
}
