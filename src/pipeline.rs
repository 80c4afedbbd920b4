//! Document lifecycle orchestration.
//!
//! [`DocumentPipeline`] ties the pieces together: extraction → chunking →
//! index building → registry bookkeeping for ingestion, and registry
//! resolution → retrieval → generation for queries. Per document the state
//! machine is `unprocessed → processing → {processed | failed}`, and
//! `processed → deleted`; a failed attempt never inserts a record, so the
//! same id can simply be retried.
//!
//! The registry sits behind an async mutex: a cooperative single-writer
//! model with no cross-process locking. Distinct documents write disjoint
//! index paths and may be processed by separate pipeline instances in
//! parallel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::chunk::Chunker;
use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::extract::TextExtractor;
use crate::index::build_index;
use crate::provider::{CompletionProvider, EmbeddingProvider};
use crate::query::{QueryEngine, QueryResult, SourceChunk};
use crate::registry::{DocumentRecord, DocumentStatus, JsonRegistryStore, Registry};

/// File name of the registry artifact inside the index directory.
pub const REGISTRY_FILE: &str = "registry.json";

pub struct DocumentPipeline {
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    chunker: Chunker,
    engine: QueryEngine,
    registry: Mutex<Registry>,
    index_dir: PathBuf,
    embedding_model: String,
}

impl DocumentPipeline {
    pub fn new(
        config: &Config,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
    ) -> Self {
        let store = JsonRegistryStore::new(config.storage.index_dir.join(REGISTRY_FILE));
        Self {
            extractor,
            embedder,
            completer,
            chunker: Chunker::from_config(&config.chunking),
            engine: QueryEngine::new(config.retrieval.top_k),
            registry: Mutex::new(Registry::new(Box::new(store))),
            index_dir: config.storage.index_dir.clone(),
            embedding_model: config.provider.embedding_model.clone(),
        }
    }

    /// Where this pipeline persists the index artifact for `document_id`.
    pub fn index_path(&self, document_id: &str) -> PathBuf {
        self.index_dir.join(format!("{document_id}.index.json"))
    }

    /// Ingest one document: extract, chunk, embed, persist index, record.
    ///
    /// On success the registry is updated and persisted; every failure
    /// leaves the registry untouched. Provider failures keep their
    /// classified kind so callers can tell them apart from bad input.
    pub async fn process(&self, source_path: &Path, document_id: &str) -> Result<DocumentRecord> {
        info!(document_id, source = %source_path.display(), "processing document");

        let text = self.extractor.extract(source_path).await?;
        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            warn!(document_id, "no usable chunks produced");
            return Err(PipelineError::Extraction(format!(
                "no text could be extracted from '{document_id}'"
            )));
        }
        info!(document_id, chunks = chunks.len(), "chunked document text");

        let index_path = self.index_path(document_id);
        build_index(
            self.embedder.as_ref(),
            document_id,
            &self.embedding_model,
            &chunks,
            &index_path,
        )
        .await
        .map_err(|e| {
            error!(document_id, error = %e, "index build failed");
            e
        })?;

        let record = DocumentRecord {
            document_id: document_id.to_string(),
            source_path: source_path.to_path_buf(),
            index_path,
            chunk_count: chunks.len(),
            status: DocumentStatus::Processed,
            processed_at: chrono::Utc::now().timestamp(),
        };

        self.registry.lock().await.insert(record.clone())?;
        info!(document_id, chunks = record.chunk_count, "document processed");
        Ok(record)
    }

    /// Answer a question against one document.
    ///
    /// With no explicit `document_id` the most recently inserted record is
    /// used. Fails with `NotFound` for an unknown id or an empty registry,
    /// and with `IndexMissing` when the recorded artifact has vanished from
    /// disk (external tampering or partial deletion).
    pub async fn query(&self, question: &str, document_id: Option<&str>) -> Result<QueryResult> {
        let record = self.resolve_record(document_id).await?;

        if !record.index_path.exists() {
            error!(
                document_id = %record.document_id,
                path = %record.index_path.display(),
                "index artifact missing at query time"
            );
            return Err(PipelineError::IndexMissing(record.index_path));
        }

        self.engine
            .answer(
                self.embedder.as_ref(),
                self.completer.as_ref(),
                question,
                &record.index_path,
            )
            .await
    }

    /// Raw top-`k` similarity lookup against one document, bypassing
    /// generation. Best-effort: any failure yields an empty sequence.
    pub async fn similar_chunks(
        &self,
        question: &str,
        document_id: Option<&str>,
        k: usize,
    ) -> Vec<SourceChunk> {
        let record = match self.resolve_record(document_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "similar_chunks: could not resolve document");
                return Vec::new();
            }
        };

        self.engine
            .similar_chunks(self.embedder.as_ref(), question, &record.index_path, k)
            .await
    }

    /// All processed document ids in insertion order.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.registry.lock().await.ids()
    }

    /// Delete a document's record, index artifact, and source artifact.
    ///
    /// Returns `Ok(false)` for an unknown id without touching anything.
    /// Artifacts already missing from disk are tolerated.
    pub async fn delete(&self, document_id: &str) -> Result<bool> {
        let mut registry = self.registry.lock().await;

        let Some(record) = registry.get(document_id)? else {
            warn!(document_id, "delete requested for unknown document");
            return Ok(false);
        };

        remove_if_exists(&record.index_path)?;
        remove_if_exists(&record.source_path)?;

        registry.remove(document_id)?;
        info!(document_id, "deleted document and artifacts");
        Ok(true)
    }

    async fn resolve_record(&self, document_id: Option<&str>) -> Result<DocumentRecord> {
        let mut registry = self.registry.lock().await;
        match document_id {
            Some(id) => registry
                .get(id)?
                .ok_or_else(|| PipelineError::NotFound(id.to_string())),
            None => {
                let record = registry.latest()?.ok_or_else(|| {
                    PipelineError::NotFound("no documents have been processed".to_string())
                })?;
                info!(document_id = %record.document_id, "no document specified, using most recent");
                Ok(record)
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
