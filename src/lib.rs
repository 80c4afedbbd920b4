//! # docqa
//!
//! A document question-answering service over PDFs.
//!
//! docqa ingests PDF documents through an extract → chunk → embed pipeline,
//! persists one semantic index per document, and answers questions with
//! retrieval-augmented generation: the question is embedded, the most
//! similar chunks are retrieved by cosine similarity, and a completion
//! model answers from that context only, with source excerpts cited back.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │   PDF    │──▶│   Pipeline    │──▶│  JSON index   │
//! │  upload  │   │ Chunk+Embed  │   │ per document  │
//! └──────────┘   └──────┬───────┘   └──────┬───────┘
//!                       │                  │
//!                       ▼                  ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │ Registry │       │  Query   │
//!                 │  (JSON)  │       │ top-k+LLM│
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docqa process report.pdf      # ingest a document
//! docqa query "What is covered?"
//! docqa list                    # show processed documents
//! docqa serve                   # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed pipeline errors |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Recursive text chunking |
//! | [`provider`] | Embedding and completion providers |
//! | [`index`] | Per-document semantic index |
//! | [`registry`] | Durable document registry |
//! | [`query`] | Retrieval-then-generate engine |
//! | [`pipeline`] | Document lifecycle orchestration |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod registry;
pub mod server;
