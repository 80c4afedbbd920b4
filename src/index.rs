//! Per-document semantic index.
//!
//! A [`SemanticIndex`] associates each chunk's embedding with its text and
//! chunk order. It is persisted as a single versioned JSON artifact per
//! document and overwritten wholesale on re-processing; there is no
//! incremental update and no cross-version compatibility guarantee beyond
//! the `format_version` check.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::provider::EmbeddingProvider;

/// Current on-disk index schema version. Bump on any incompatible change.
pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct SemanticIndex {
    pub format_version: u32,
    pub document_id: String,
    /// Embedding model the vectors were produced with. Vectors from a
    /// different model are not comparable, so this is recorded for
    /// diagnostics rather than silently mixed.
    pub embedding_model: String,
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl SemanticIndex {
    /// Return the `k` entries most similar to `query`, ranked by cosine
    /// similarity descending. Ties break on chunk order so ranking stays
    /// deterministic.
    pub fn top_k(&self, query: &[f32], k: usize) -> Vec<&IndexEntry> {
        let mut scored: Vec<(f32, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.embedding), entry))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.chunk_index.cmp(&b.1.chunk_index))
        });

        scored.into_iter().take(k).map(|(_, e)| e).collect()
    }
}

/// Embed `chunks` and persist the resulting index at `path`, overwriting any
/// prior artifact.
///
/// Provider failures propagate with their classified kind; filesystem
/// failures surface as [`PipelineError::Io`]. The registry is not touched
/// here — recording the document is the orchestrator's job.
pub async fn build_index(
    embedder: &dyn EmbeddingProvider,
    document_id: &str,
    embedding_model: &str,
    chunks: &[String],
    path: &Path,
) -> Result<()> {
    if chunks.is_empty() {
        return Err(PipelineError::Build(
            "cannot build an index from zero chunks".to_string(),
        ));
    }

    debug!(document_id, chunks = chunks.len(), "embedding chunks");
    let embeddings = embedder.embed_batch(chunks).await?;
    if embeddings.len() != chunks.len() {
        return Err(PipelineError::Build(format!(
            "embedding count mismatch: {} chunks, {} vectors",
            chunks.len(),
            embeddings.len()
        )));
    }

    let index = SemanticIndex {
        format_version: INDEX_FORMAT_VERSION,
        document_id: document_id.to_string(),
        embedding_model: embedding_model.to_string(),
        entries: chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_index, (text, embedding))| IndexEntry {
                chunk_index,
                text: text.clone(),
                embedding,
            })
            .collect(),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = serde_json::to_vec(&index)?;
    std::fs::write(path, serialized)?;

    info!(
        document_id,
        entries = index.entries.len(),
        path = %path.display(),
        "persisted semantic index"
    );
    Ok(())
}

/// Load a persisted index, failing with [`PipelineError::IndexMissing`] when
/// the artifact is absent and [`PipelineError::Build`] when it cannot be
/// decoded or carries a different format version.
pub fn load_index(path: &Path) -> Result<SemanticIndex> {
    if !path.exists() {
        return Err(PipelineError::IndexMissing(path.to_path_buf()));
    }

    let bytes = std::fs::read(path)?;
    let index: SemanticIndex = serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::Build(format!("index artifact is not readable: {e}")))?;

    if index.format_version != INDEX_FORMAT_VERSION {
        return Err(PipelineError::Build(format!(
            "index format version {} is not supported (expected {})",
            index.format_version, INDEX_FORMAT_VERSION
        )));
    }

    Ok(index)
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
