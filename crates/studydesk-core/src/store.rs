//! Flat-file document store. The whole application state lives in one JSON document
//! that is read once and overwritten in full on every save.

use crate::catalog::MaterialRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_FILE: &str = "data.json";

/// Subjects seeded into a fresh document.
pub const DEFAULT_SUBJECTS: [&str; 6] = [
    "Mathematics",
    "Physics",
    "Programming",
    "English",
    "History",
    "Chemistry",
];

pub fn default_subjects() -> Vec<String> {
    DEFAULT_SUBJECTS.iter().map(|s| s.to_string()).collect()
}

/// The persisted root object: `{ "users": [...], "materials": [...], "subjects": [...] }`.
///
/// Deserialization never rejects a JSON object: entries of an unexpected shape are kept
/// raw and unknown top-level keys are carried in `extra`, so a save writes them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Document {
    /// Opaque records, passed through untouched.
    pub users: Vec<Value>,
    pub materials: Vec<MaterialRecord>,
    pub subjects: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            materials: Vec::new(),
            subjects: default_subjects(),
            extra: Map::new(),
        }
    }
}

impl From<Value> for Document {
    fn from(raw: Value) -> Self {
        let mut obj = match ensure_defaults(raw) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let users = match obj.remove("users") {
            Some(Value::Array(items)) => items,
            other => {
                tracing::warn!("[STORE] `users` is not an array ({:?}); starting empty.", other);
                Vec::new()
            }
        };

        let materials = match obj.remove("materials") {
            Some(Value::Array(items)) => items.into_iter().map(MaterialRecord::from_value).collect(),
            other => {
                tracing::warn!("[STORE] `materials` is not an array ({:?}); starting empty.", other);
                Vec::new()
            }
        };

        let subjects = match obj.remove("subjects") {
            Some(Value::Array(items)) => {
                let total = items.len();
                let names: Vec<String> = items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                if names.len() != total {
                    tracing::warn!(
                        "[STORE] Dropped {} non-string subject(s).",
                        total - names.len()
                    );
                }
                names
            }
            other => {
                tracing::warn!("[STORE] `subjects` is not an array ({:?}); using defaults.", other);
                default_subjects()
            }
        };

        Self {
            users,
            materials,
            subjects,
            extra: obj,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("data file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("data file JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("data file root is not a JSON object")]
    NotAnObject,
}

/// Backfills `users`, `materials` and `subjects` on a raw JSON object when they are absent.
/// Keys that are present are left alone, so applying it twice changes nothing.
pub fn ensure_defaults(raw: Value) -> Value {
    let mut obj = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    obj.entry("users").or_insert_with(|| Value::Array(Vec::new()));
    obj.entry("materials")
        .or_insert_with(|| Value::Array(Vec::new()));
    obj.entry("subjects").or_insert_with(|| {
        Value::Array(DEFAULT_SUBJECTS.iter().map(|s| Value::from(*s)).collect())
    });
    Value::Object(obj)
}

/// JSON document on disk.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the default document if no data file exists yet. Best-effort.
    pub fn init(&self) {
        if self.path.exists() {
            return;
        }
        tracing::info!("[STORE] No data file at {}; seeding defaults.", self.path.display());
        self.persist(&Document::default());
    }

    /// Reads and parses the data file. Only I/O failures, JSON syntax errors and a non-object
    /// root are errors; records of an unexpected shape are kept as they are.
    pub fn read(&self) -> Result<Document, StoreError> {
        let text = fs::read_to_string(&self.path)?;
        let raw: Value = serde_json::from_str(&text)?;
        if !raw.is_object() {
            return Err(StoreError::NotAnObject);
        }
        Ok(Document::from(raw))
    }

    /// Loads the document. A missing or unparseable file yields a fresh default document.
    pub fn load(&self) -> Document {
        match self.read() {
            Ok(doc) => doc,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("[STORE] {} not found; using defaults.", self.path.display());
                Document::default()
            }
            Err(e) => {
                tracing::warn!(
                    "[STORE] Could not load {}: {}. Using defaults.",
                    self.path.display(),
                    e
                );
                Document::default()
            }
        }
    }

    /// Overwrites the data file with `doc` (pretty-printed, UTF-8 kept as-is).
    pub fn save(&self, doc: &Document) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(doc)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Best-effort save: a failure is logged and otherwise ignored.
    pub fn persist(&self, doc: &Document) -> bool {
        match self.save(doc) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "[STORE] Failed to persist {}: {}. Changes are kept in memory only.",
                    self.path.display(),
                    e
                );
                false
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_FILE)
    }
}
