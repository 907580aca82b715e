//! JSON-file-backed key-value store.
//!
//! Small persistence helper for job state and settings: a flat JSON object
//! on disk, loaded on open and written back on [`JsonStore::save`]. Missing
//! files are initialized from an optional default object and persisted
//! immediately.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} does not contain a JSON object")]
    NotAnObject { path: PathBuf },
}

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    data: Map<String, Value>,
}

impl JsonStore {
    /// Open the store at `path`.
    ///
    /// An existing file is parsed (and must hold a JSON object). A missing
    /// file is initialized from `default` — empty when `None` — and written
    /// out right away, creating parent directories as needed.
    pub fn open(path: impl Into<PathBuf>, default: Option<Map<String, Value>>) -> Result<Self, StoreError> {
        let path = path.into();
        if path.is_file() {
            let raw = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            let value: Value = serde_json::from_str(&raw).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
            match value {
                Value::Object(data) => Ok(Self { path, data }),
                _ => Err(StoreError::NotAnObject { path }),
            }
        } else {
            let store = Self {
                path,
                data: default.unwrap_or_default(),
            };
            store.save()?;
            Ok(store)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Persist pretty-printed (two-space indent).
    pub fn save(&self) -> Result<(), StoreError> {
        self.write(serde_json::to_string_pretty(&self.data))
    }

    /// Persist without whitespace.
    pub fn save_compact(&self) -> Result<(), StoreError> {
        self.write(serde_json::to_string(&self.data))
    }

    fn write(&self, serialized: Result<String, serde_json::Error>) -> Result<(), StoreError> {
        let serialized = serialized.map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        fs::write(&self.path, serialized).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
