//! Shared helpers for integration tests: deterministic provider fakes and a
//! minimal hand-assembled PDF.
#![allow(dead_code)]

use std::path::Path;

use async_trait::async_trait;

use docqa::config::Config;
use docqa::error::{PipelineError, Result};
use docqa::provider::{CompletionProvider, EmbeddingProvider};

/// Config with storage rooted in a temp dir and a chunk filter loose enough
/// for short fixture texts.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.upload_dir = dir.join("uploads");
    config.storage.index_dir = dir.join("indexes");
    config.chunking.min_chunk_chars = 5;
    config
}

/// Deterministic embedder: a 16-dim bag-of-words histogram, so texts sharing
/// words land near each other under cosine similarity.
pub struct FakeEmbedder;

fn fake_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 16];
    for word in text.to_lowercase().split_whitespace() {
        let slot = word.bytes().map(|b| b as usize).sum::<usize>() % 16;
        v[slot] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| fake_embedding(t)).collect())
    }
}

/// Embedder that always fails with a classified auth error.
pub struct AuthFailingEmbedder;

#[async_trait]
impl EmbeddingProvider for AuthFailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(PipelineError::ProviderAuth("invalid API key".to_string()))
    }
}

/// Completer that echoes the prompt so tests can assert on the context that
/// reached the model.
pub struct EchoCompleter;

#[async_trait]
impl CompletionProvider for EchoCompleter {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(format!("ANSWER FROM: {prompt}"))
    }
}

/// Minimal valid single-page PDF containing `phrase` as its only text.
/// Builds the body first, then an xref table with correct byte offsets so
/// pdf-extract can parse it.
pub fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({phrase}) Tj ET\n");

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(format!("4 0 obj << /Length {} >> stream\n", stream.len()).as_bytes());
    out.extend_from_slice(stream.as_bytes());
    out.extend_from_slice(b"endstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}
