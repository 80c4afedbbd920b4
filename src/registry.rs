//! Durable registry of processed documents.
//!
//! The registry is the authoritative mapping from document id to its
//! [`DocumentRecord`]. Records live in memory as an insertion-ordered list
//! (re-processing an existing id overwrites its record in place; only new
//! ids append), which makes "the most recently inserted document" a
//! well-defined default query target across process restarts.
//!
//! Persistence goes through the [`RegistryStore`] trait so tests can swap
//! the backend. The shipped [`JsonRegistryStore`] rewrites a single
//! versioned JSON file on every mutation — no append log, no coordination
//! between concurrent writers (single-writer assumption).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Current on-disk registry schema version.
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

/// One record per successfully processed document. Failed processing
/// attempts never produce a record, so the same id can simply be retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    /// Location of the original uploaded artifact.
    pub source_path: PathBuf,
    /// Location of the persisted semantic index for this document.
    pub index_path: PathBuf,
    pub chunk_count: usize,
    pub status: DocumentStatus,
    /// Unix seconds at which processing completed.
    pub processed_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processed,
}

#[derive(Serialize, Deserialize)]
struct RegistryFile {
    format_version: u32,
    documents: Vec<DocumentRecord>,
}

/// Persistence backend for the registry.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<Vec<DocumentRecord>>;
    fn save(&self, records: &[DocumentRecord]) -> Result<()>;
}

/// Whole-file JSON persistence with a format-version field.
pub struct JsonRegistryStore {
    path: PathBuf,
}

impl JsonRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for JsonRegistryStore {
    fn load(&self) -> Result<Vec<DocumentRecord>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no registry artifact yet, starting fresh");
            return Ok(Vec::new());
        }

        let bytes = std::fs::read(&self.path)?;
        let file: RegistryFile = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::Build(format!("registry artifact is not readable: {e}")))?;

        if file.format_version != REGISTRY_FORMAT_VERSION {
            return Err(PipelineError::Build(format!(
                "registry format version {} is not supported (expected {})",
                file.format_version, REGISTRY_FORMAT_VERSION
            )));
        }

        debug!(documents = file.documents.len(), "loaded registry");
        Ok(file.documents)
    }

    fn save(&self, records: &[DocumentRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = RegistryFile {
            format_version: REGISTRY_FORMAT_VERSION,
            documents: records.to_vec(),
        };
        std::fs::write(&self.path, serde_json::to_vec(&file)?)?;
        Ok(())
    }
}

/// In-memory registry view over an injected store.
///
/// Loading is lazy: the store is consulted whenever the in-memory list is
/// empty, so a freshly constructed registry picks up state persisted by an
/// earlier process.
pub struct Registry {
    store: Box<dyn RegistryStore>,
    records: Vec<DocumentRecord>,
}

impl Registry {
    pub fn new(store: Box<dyn RegistryStore>) -> Self {
        Self {
            store,
            records: Vec::new(),
        }
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.records.is_empty() {
            self.records = self.store.load()?;
        }
        Ok(())
    }

    /// Insert or overwrite a record and persist the registry.
    ///
    /// An existing id keeps its position in insertion order; a new id is
    /// appended and becomes the default query target.
    pub fn insert(&mut self, record: DocumentRecord) -> Result<()> {
        self.ensure_loaded()?;

        match self
            .records
            .iter_mut()
            .find(|r| r.document_id == record.document_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }

        self.store.save(&self.records)?;
        Ok(())
    }

    pub fn get(&mut self, document_id: &str) -> Result<Option<DocumentRecord>> {
        self.ensure_loaded()?;
        Ok(self
            .records
            .iter()
            .find(|r| r.document_id == document_id)
            .cloned())
    }

    /// The most recently inserted record, if any.
    pub fn latest(&mut self) -> Result<Option<DocumentRecord>> {
        self.ensure_loaded()?;
        Ok(self.records.last().cloned())
    }

    /// All known document ids in insertion order.
    pub fn ids(&mut self) -> Result<Vec<String>> {
        self.ensure_loaded()?;
        Ok(self.records.iter().map(|r| r.document_id.clone()).collect())
    }

    /// Remove a record and persist. Returns the removed record, or `None`
    /// (with no persistence) when the id is unknown.
    pub fn remove(&mut self, document_id: &str) -> Result<Option<DocumentRecord>> {
        self.ensure_loaded()?;

        let Some(pos) = self
            .records
            .iter()
            .position(|r| r.document_id == document_id)
        else {
            return Ok(None);
        };

        let removed = self.records.remove(pos);
        self.store.save(&self.records)?;
        info!(document_id, "removed document record");
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, chunks: usize) -> DocumentRecord {
        DocumentRecord {
            document_id: id.to_string(),
            source_path: PathBuf::from(format!("uploads/{id}")),
            index_path: PathBuf::from(format!("indexes/{id}.index.json")),
            chunk_count: chunks,
            status: DocumentStatus::Processed,
            processed_at: 1_700_000_000,
        }
    }

    fn registry_in(dir: &TempDir) -> Registry {
        Registry::new(Box::new(JsonRegistryStore::new(
            dir.path().join("registry.json"),
        )))
    }

    #[test]
    fn insert_persists_and_survives_reload() {
        let dir = TempDir::new().unwrap();

        let mut registry = registry_in(&dir);
        registry.insert(record("a.pdf", 3)).unwrap();
        registry.insert(record("b.pdf", 5)).unwrap();

        // A second registry over the same store sees the same state.
        let mut reloaded = registry_in(&dir);
        assert_eq!(reloaded.ids().unwrap(), vec!["a.pdf", "b.pdf"]);
        assert_eq!(reloaded.get("b.pdf").unwrap().unwrap().chunk_count, 5);
    }

    #[test]
    fn insertion_order_determines_latest() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        registry.insert(record("a.pdf", 1)).unwrap();
        registry.insert(record("b.pdf", 1)).unwrap();
        registry.insert(record("c.pdf", 1)).unwrap();

        assert_eq!(registry.latest().unwrap().unwrap().document_id, "c.pdf");
        assert_eq!(registry.ids().unwrap(), vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn reprocessing_overwrites_in_place_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        registry.insert(record("a.pdf", 3)).unwrap();
        registry.insert(record("b.pdf", 4)).unwrap();
        registry.insert(record("a.pdf", 7)).unwrap();

        assert_eq!(registry.ids().unwrap(), vec!["a.pdf", "b.pdf"]);
        assert_eq!(registry.get("a.pdf").unwrap().unwrap().chunk_count, 7);
        // Overwriting does not reorder: b.pdf is still the latest insert.
        assert_eq!(registry.latest().unwrap().unwrap().document_id, "b.pdf");
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        registry.insert(record("a.pdf", 2)).unwrap();

        assert!(registry.remove("missing.pdf").unwrap().is_none());
        assert_eq!(registry.ids().unwrap(), vec!["a.pdf"]);
    }

    #[test]
    fn remove_known_id_persists_the_removal() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        registry.insert(record("a.pdf", 2)).unwrap();
        registry.insert(record("b.pdf", 2)).unwrap();

        let removed = registry.remove("a.pdf").unwrap().unwrap();
        assert_eq!(removed.document_id, "a.pdf");

        let mut reloaded = registry_in(&dir);
        assert_eq!(reloaded.ids().unwrap(), vec!["b.pdf"]);
    }

    #[test]
    fn empty_store_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        assert!(registry.ids().unwrap().is_empty());
        assert!(registry.latest().unwrap().is_none());
    }

    #[test]
    fn corrupt_registry_artifact_is_a_build_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("registry.json"), b"not json").unwrap();

        let mut registry = registry_in(&dir);
        assert!(matches!(
            registry.ids().unwrap_err(),
            PipelineError::Build(_)
        ));
    }
}
