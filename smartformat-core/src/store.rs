//! Project persistence over a simple key-value layer.
//!
//! One JSON record per project, stored under `project-layout:{id}`. Loads
//! never fail loudly: a missing or corrupt record is reported as `None`.
//! The store is single-writer and needs no locking.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::legacy::{parse_legacy, upgrade};
use crate::{Element, FormatResult, ProjectLayout};

/// Key prefix for project records.
pub const PROJECT_KEY_PREFIX: &str = "project-layout:";

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested project does not exist.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal string key-value persistence.
pub trait KeyValueBackend {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&mut self, key: &str) -> Result<bool, StoreError>;

    /// All keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    /// Empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// One JSON file per key in a data directory.
///
/// Keys are sanitized into file names, so [`KeyValueBackend::keys`] reports
/// the sanitized form.
#[derive(Debug, Clone)]
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    /// Open a data directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StoreError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Replace any character that is not ASCII alphanumeric, `-`, or `_` with `_`.
fn sanitize_filename(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn project_key(id: &str) -> String {
    format!("{PROJECT_KEY_PREFIX}{id}")
}

/// Project id of a backend key, in raw or sanitized form.
fn project_id(key: &str) -> Option<&str> {
    key.strip_prefix(PROJECT_KEY_PREFIX)
        .or_else(|| key.strip_prefix(sanitize_filename(PROJECT_KEY_PREFIX).as_str()))
}

/// Listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    /// Project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Customised format keys.
    pub formats: Vec<String>,
    /// Last modification time, ms since the Unix epoch.
    pub updated_at: u64,
}

/// Project records over a key-value backend.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> ProjectStore<B> {
    /// Wrap a backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Create and persist a new project.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn create(
        &mut self,
        name: &str,
        master_layout: Vec<Element>,
    ) -> Result<ProjectLayout, StoreError> {
        let project = ProjectLayout::new(name, master_layout);
        self.save(&project)?;
        tracing::info!(project_id = %project.id, "Created project {name}");
        Ok(project)
    }

    /// Load a project. Missing or corrupt records yield `None`.
    ///
    /// Records in the legacy per-format shape are upgraded on the fly.
    pub fn load(&self, id: &str) -> Option<ProjectLayout> {
        self.load_key(&project_key(id), id)
    }

    fn load_key(&self, key: &str, id: &str) -> Option<ProjectLayout> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(project_id = %id, "Failed to read project: {e}");
                return None;
            }
        };
        match decode(&raw, id) {
            Ok(project) => Some(project),
            Err(e) => {
                tracing::warn!(project_id = %id, "Ignoring unreadable project record: {e}");
                None
            }
        }
    }

    /// Persist a project, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn save(&mut self, project: &ProjectLayout) -> Result<(), StoreError> {
        let json = serde_json::to_string(project)?;
        self.backend.set(&project_key(&project.id), &json)?;
        tracing::debug!(
            project_id = %project.id,
            overrides = project.overrides.len(),
            "Saved project"
        );
        Ok(())
    }

    /// Delete a project. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        self.backend.remove(&project_key(id))
    }

    /// Summaries of all readable projects, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be listed.
    pub fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let mut summaries: Vec<ProjectSummary> = self
            .backend
            .keys()?
            .iter()
            .filter_map(|key| self.load_key(key, project_id(key)?))
            .map(|project| ProjectSummary {
                formats: project.format_keys().map(String::from).collect(),
                id: project.id,
                name: project.name,
                updated_at: project.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Import a project record (current or legacy shape) and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FormatError::ImportRejected`] with a reason for
    /// malformed input, or [`crate::FormatError::Storage`] if the record
    /// cannot be written.
    pub fn import(&mut self, json: &str) -> FormatResult<ProjectLayout> {
        let project = decode(json, &uuid::Uuid::new_v4().to_string())?;
        self.save(&project)?;
        tracing::info!(project_id = %project.id, "Imported project {}", project.name);
        Ok(project)
    }

    /// Pretty JSON of a stored project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProjectNotFound`] if the project cannot be loaded.
    pub fn export(&self, id: &str) -> Result<String, StoreError> {
        let project = self
            .load(id)
            .ok_or_else(|| StoreError::ProjectNotFound(id.to_string()))?;
        Ok(serde_json::to_string_pretty(&project)?)
    }
}

/// Display name given to upgraded legacy records, which carry none.
pub const LEGACY_PROJECT_NAME: &str = "Imported project";

/// Decode a project record, falling back to the legacy shape.
///
/// The rejection reason of the current shape wins if both fail.
fn decode(json: &str, fallback_id: &str) -> FormatResult<ProjectLayout> {
    match ProjectLayout::from_json(json) {
        Ok(project) => Ok(project),
        Err(rejection) => match parse_legacy(json) {
            Ok(record) if !record.is_empty() => upgrade(record, fallback_id, LEGACY_PROJECT_NAME),
            _ => Err(rejection),
        },
    }
}
