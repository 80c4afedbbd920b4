//! Retrieval-then-generate query engine.
//!
//! Answers a question against one document's semantic index: embed the
//! question, pull the top-k most similar chunks, stuff them into a fixed
//! prompt, and ask the completion provider. The prompt instructs the model
//! to answer only from the supplied context and to say "I don't know"
//! otherwise — a prompt-level contract, not enforced in code.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::index::{load_index, IndexEntry};
use crate::provider::{CompletionProvider, EmbeddingProvider};

/// Caller-facing source excerpts are cut to this many characters.
pub const MAX_SOURCE_CHARS: usize = 200;

const ANSWER_PROMPT: &str = "\
Use the following pieces of context to answer the question at the end. \
If you don't know the answer based on the context provided, just say that you don't know, \
don't try to make up an answer.

Context:
{context}

Question: {question}

Answer: ";

/// A retrieved chunk as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SourceChunk {
    pub content: String,
    pub metadata: serde_json::Value,
}

/// The answer to one query, with its cited sources.
#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<SourceChunk>,
    pub document_id: String,
}

pub struct QueryEngine {
    top_k: usize,
}

impl QueryEngine {
    pub fn new(top_k: usize) -> Self {
        Self { top_k }
    }

    /// Answer `question` from the index at `index_path`.
    ///
    /// Fails with `IndexMissing` when the artifact is absent; provider
    /// failures during embedding or generation propagate with their
    /// classified kind — they are never converted to an empty result.
    pub async fn answer(
        &self,
        embedder: &dyn EmbeddingProvider,
        completer: &dyn CompletionProvider,
        question: &str,
        index_path: &Path,
    ) -> Result<QueryResult> {
        let index = load_index(index_path)?;
        debug!(
            document_id = %index.document_id,
            entries = index.entries.len(),
            "loaded index for query"
        );

        let query_embedding = embedder.embed_query(question).await?;
        let hits = index.top_k(&query_embedding, self.top_k);

        let context = hits
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = render_prompt(&context, question);

        let answer = completer.complete(&prompt).await?;
        let sources = hits
            .iter()
            .map(|e| SourceChunk {
                content: truncate_content(&e.text),
                metadata: chunk_metadata(e),
            })
            .collect();

        info!(document_id = %index.document_id, retrieved = hits.len(), "answered query");
        Ok(QueryResult {
            answer,
            sources,
            document_id: index.document_id,
        })
    }

    /// Raw similarity lookup, bypassing generation.
    ///
    /// Best-effort: any failure (missing index, provider error) is logged
    /// and yields an empty sequence. Returned contents are untruncated.
    pub async fn similar_chunks(
        &self,
        embedder: &dyn EmbeddingProvider,
        question: &str,
        index_path: &Path,
        k: usize,
    ) -> Vec<SourceChunk> {
        let index = match load_index(index_path) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "similar_chunks: could not load index");
                return Vec::new();
            }
        };

        let query_embedding = match embedder.embed_query(question).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "similar_chunks: embedding failed");
                return Vec::new();
            }
        };

        index
            .top_k(&query_embedding, k)
            .into_iter()
            .map(|e| SourceChunk {
                content: e.text.clone(),
                metadata: chunk_metadata(e),
            })
            .collect()
    }
}

fn chunk_metadata(entry: &IndexEntry) -> serde_json::Value {
    serde_json::json!({ "chunk_index": entry.chunk_index })
}

fn render_prompt(context: &str, question: &str) -> String {
    ANSWER_PROMPT
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Cut `text` to [`MAX_SOURCE_CHARS`] characters, appending an ellipsis when
/// anything was dropped.
fn truncate_content(text: &str) -> String {
    if text.chars().count() <= MAX_SOURCE_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_SOURCE_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_untouched() {
        assert_eq!(truncate_content("short"), "short");
        let exactly = "x".repeat(MAX_SOURCE_CHARS);
        assert_eq!(truncate_content(&exactly), exactly);
    }

    #[test]
    fn long_content_is_cut_with_ellipsis() {
        let long = "y".repeat(MAX_SOURCE_CHARS + 1);
        let cut = truncate_content(&long);
        assert_eq!(cut.chars().count(), MAX_SOURCE_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn prompt_embeds_context_and_question() {
        let prompt = render_prompt("X is a widget.", "What is X?");
        assert!(prompt.contains("Context:\nX is a widget."));
        assert!(prompt.contains("Question: What is X?"));
        assert!(prompt.contains("just say that you don't know"));
    }
}
