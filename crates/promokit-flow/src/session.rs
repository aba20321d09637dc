//! Key/value session state shared between pipeline stages.
//!
//! Values are JSON strings. Stages never hold state in memory across steps;
//! each one reads what it needs back out of the store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Slot names used across the pipeline.
pub mod keys {
    /// The encoded generation request, replayed by regenerate.
    pub const LAST_GENERATE_PAYLOAD: &str = "last_generate_payload";
    /// Raw JSON of the most recent generation response.
    pub const LAST_GENERATE_RESULT: &str = "last_generate_result";
    /// Storage keys of the uploaded images.
    pub const LAST_UPLOAD_IMAGE_KEYS: &str = "last_upload_image_keys";
    /// Store name, area keywords and social handle for publishing.
    pub const LAST_PUBLISH_CONTEXT: &str = "last_publish_context";
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session slot '{key}' holds malformed JSON: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode session slot '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("session I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session key '{0}'")]
    InvalidKey(String),
}

/// String-valued session storage.
pub trait SessionStore: Send + Sync {
    /// Returns the stored value, or `None` if the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Overwrites a slot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Empties a slot. Clearing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be written.
    fn clear(&self, key: &str) -> Result<(), SessionError>;
}

/// Typed JSON access on top of any [`SessionStore`].
pub trait SessionStoreExt: SessionStore {
    /// # Errors
    ///
    /// Returns [`SessionError::Corrupt`] if the slot does not decode as `T`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| SessionError::Corrupt {
                    key: key.to_string(),
                    source: e,
                }),
            None => Ok(None),
        }
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] if `value` cannot be serialized, or
    /// any error from the underlying store.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let raw = serde_json::to_string(value).map_err(|e| SessionError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        self.set(key, &raw)
    }
}

impl<S: SessionStore + ?Sized> SessionStoreExt for S {}

/// In-process store, scoped to the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), SessionError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a directory.
///
/// Lets separate CLI invocations share a flow the way pages of one browser
/// tab share session storage. Writes go through a temp file and rename so a
/// crash never leaves a half-written slot.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf, SessionError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SessionError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let path = self.slot_path(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let path = self.slot_path(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| io_error(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))?;
        tracing::debug!(key, path = %path.display(), "session slot written");
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), SessionError> {
        let path = self.slot_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }
}
