//! Installation state document
//!
//! A single JSON object records what is installed:
//!
//! ```json
//! {
//!   "env_path": "/opt/vixen-env",
//!   "exec_paths": ["/usr/bin/vxm"]
//! }
//! ```
//!
//! Documents go through a [`DocumentStore`]; writes replace the whole file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

// ============================================================================
// Install State
// ============================================================================

/// What is currently installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallState {
    /// Root installation directory
    pub env_path: String,

    /// Installed executables, without duplicates
    #[serde(default)]
    pub exec_paths: Vec<String>,
}

impl InstallState {
    pub fn new<I, S>(env_path: impl Into<String>, exec_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = Self {
            env_path: env_path.into(),
            exec_paths: Vec::new(),
        };
        for path in exec_paths {
            state.add_exec_path(path);
        }
        state
    }

    /// Add an executable path unless already tracked
    pub fn add_exec_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.exec_paths.contains(&path) {
            self.exec_paths.push(path);
        }
    }

    /// Duplicate-free union of both path lists; `other.env_path` wins
    ///
    /// Existing entries keep their order, new ones are appended.
    pub fn merged(&self, other: &InstallState) -> InstallState {
        let mut merged = InstallState::new(other.env_path.clone(), self.exec_paths.clone());
        for path in &other.exec_paths {
            merged.add_exec_path(path.clone());
        }
        merged
    }

    /// Every path a snapshot must protect: the environment, then executables
    pub fn managed_paths(&self) -> Vec<PathBuf> {
        std::iter::once(&self.env_path)
            .chain(&self.exec_paths)
            .map(PathBuf::from)
            .collect()
    }

    fn to_document(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(source) => Err(Error::StateFormat {
                path: PathBuf::new(),
                source,
            }),
        }
    }
}

// ============================================================================
// Document Store
// ============================================================================

/// Key-value document persistence.
pub trait DocumentStore {
    /// Read the document at `path`, `None` if it does not exist
    fn read(&self, path: &Path) -> Result<Option<Map<String, Value>>>;

    /// Write `doc` as the whole content of `path`
    fn create(&self, path: &Path, doc: &Map<String, Value>) -> Result<()>;

    /// Overlay `doc`'s keys onto the existing document at `path`
    fn update(&self, path: &Path, doc: &Map<String, Value>) -> Result<()> {
        let mut current = self
            .read(path)?
            .ok_or_else(|| Error::StateMissing(path.to_path_buf()))?;
        for (key, value) in doc {
            current.insert(key.clone(), value.clone());
        }
        self.create(path, &current)
    }

    /// Delete the document at `path`; Ok if already absent
    fn delete(&self, path: &Path) -> Result<()>;
}

/// Pretty-printed JSON files, replaced atomically through a sibling temp file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileStore;

impl DocumentStore for JsonFileStore {
    fn read(&self, path: &Path) -> Result<Option<Map<String, Value>>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::StateIo {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let doc = serde_json::from_str(&content).map_err(|source| Error::StateFormat {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded state document from {}", path.display());
        Ok(Some(doc))
    }

    fn create(&self, path: &Path, doc: &Map<String, Value>) -> Result<()> {
        let io_err = |source| Error::StateIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let mut content = serde_json::to_string_pretty(doc).map_err(|source| Error::StateFormat {
            path: path.to_path_buf(),
            source,
        })?;
        content.push('\n');

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;

        log::debug!("Saved state document to {}", path.display());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::StateIo {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

// ============================================================================
// State Store
// ============================================================================

/// The installation state document at a fixed location.
pub struct StateStore {
    path: PathBuf,
    store: Box<dyn DocumentStore>,
}

impl StateStore {
    /// JSON state file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_store(path, Box::new(JsonFileStore))
    }

    pub fn with_store(path: impl Into<PathBuf>, store: Box<dyn DocumentStore>) -> Self {
        Self {
            path: path.into(),
            store,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the state, `None` if no document exists
    pub fn read(&self) -> Result<Option<InstallState>> {
        let Some(doc) = self.store.read(&self.path)? else {
            return Ok(None);
        };
        serde_json::from_value(Value::Object(doc))
            .map(Some)
            .map_err(|source| Error::StateFormat {
                path: self.path.clone(),
                source,
            })
    }

    /// Write a fresh document, creating the parent directory if needed
    pub fn create(&self, state: &InstallState) -> Result<()> {
        self.store.create(&self.path, &state.to_document()?)
    }

    /// Merge `state` into the existing document
    ///
    /// Executable paths become the union of both documents; keys this crate
    /// does not know about are kept.
    pub fn update(&self, state: &InstallState) -> Result<()> {
        let current = self
            .read()?
            .ok_or_else(|| Error::StateMissing(self.path.clone()))?;
        let merged = current.merged(state);
        self.store.update(&self.path, &merged.to_document()?)
    }

    /// Delete the document
    pub fn remove(&self) -> Result<()> {
        self.store.delete(&self.path)
    }
}

// ============================================================================
// Tests
// ============================================================================
