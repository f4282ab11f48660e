//! Persistence of the OAuth token pair between invocations.
//!
//! # Design
//! The store is the only place credential state lives. The token manager
//! writes it after a successful exchange and the API transport reads the
//! access token from it before every call; neither keeps a cached copy.
//! `load` never fails: a missing file, unreadable file or document that is
//! not a credential record all mean "no credentials yet", which sends the
//! next login down the client-credentials path.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Default location of the credential file, relative to the working directory.
pub const DEFAULT_CREDENTIALS_PATH: &str = ".bandcamp/credentials.json";

/// The token exchange response, stored verbatim.
///
/// Fields other than the two tokens (`expires_in`, `token_type`, ...) are
/// opaque and kept in `extra` so the file mirrors what the provider sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialRecord {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            extra: Map::new(),
        }
    }
}

pub trait CredentialStore {
    /// The current record, or `None` when there is none usable.
    fn load(&self) -> Option<CredentialRecord>;

    /// Replace the stored record.
    fn save(&self, record: &CredentialRecord) -> Result<(), ApiError>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for &S {
    fn load(&self) -> Option<CredentialRecord> {
        (**self).load()
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), ApiError> {
        (**self).save(record)
    }
}

/// JSON file at a fixed path. Last writer wins; there is no locking.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<CredentialRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no credentials on disk");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable credential file");
                None
            }
        }
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ApiError::Storage(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| ApiError::Storage(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Option<CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new(record: Option<CredentialRecord>) -> Self {
        Self {
            record: Mutex::new(record),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<CredentialRecord> {
        self.record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), ApiError> {
        *self
            .record
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(record.clone());
        Ok(())
    }
}
