//! # docqa CLI
//!
//! The `docqa` binary drives the document QA pipeline: ingest PDFs, ask
//! questions against them, manage the document registry, and start the
//! HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa process <file>` | Extract, chunk, embed, and index a PDF |
//! | `docqa query "<question>"` | Answer a question from an indexed document |
//! | `docqa list` | List processed document ids |
//! | `docqa delete <id>` | Delete a document and its artifacts |
//! | `docqa serve` | Start the HTTP API server |
//!
//! All provider calls authenticate via the `OPENAI_API_KEY` environment
//! variable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docqa::config;
use docqa::extract::PdfExtractor;
use docqa::pipeline::DocumentPipeline;
use docqa::provider::OpenAiProvider;
use docqa::server;

/// docqa — retrieval-augmented question answering over PDF documents.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Document QA — ingest PDFs and answer questions against them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml`. Missing file falls back to
    /// built-in defaults; see `config/docqa.example.toml`.
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Process a PDF into a queryable semantic index.
    ///
    /// Extracts text, chunks it, embeds every chunk, persists the index,
    /// and records the document in the registry.
    Process {
        /// Path to the PDF file.
        file: PathBuf,

        /// Document id to register under. Defaults to the file name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Ask a question against a processed document.
    ///
    /// Without `--document` the most recently processed document is used.
    Query {
        /// The question to answer.
        question: String,

        /// Target document id.
        #[arg(long)]
        document: Option<String>,
    },

    /// List processed document ids in processing order.
    List,

    /// Delete a document's registry record, index, and source artifact.
    Delete {
        /// Document id to delete.
        id: String,
    },

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::default()
    };

    let provider = Arc::new(
        OpenAiProvider::from_env(cfg.provider.clone())
            .context("configuring the OpenAI provider")?,
    );
    let pipeline = Arc::new(DocumentPipeline::new(
        &cfg,
        Arc::new(PdfExtractor),
        provider.clone(),
        provider,
    ));

    match cli.command {
        Commands::Process { file, name } => {
            let document_id = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("file path has no file name")?,
            };
            let record = pipeline.process(&file, &document_id).await?;
            println!(
                "Processed '{}' into {} chunks.",
                record.document_id, record.chunk_count
            );
        }
        Commands::Query { question, document } => {
            let result = pipeline.query(&question, document.as_deref()).await?;
            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!("\nSources ({}):", result.document_id);
                for source in &result.sources {
                    println!("  - {}", source.content.replace('\n', " "));
                }
            }
        }
        Commands::List => {
            let documents = pipeline.list().await?;
            if documents.is_empty() {
                println!("No documents processed yet.");
            } else {
                for id in documents {
                    println!("{id}");
                }
            }
        }
        Commands::Delete { id } => {
            if pipeline.delete(&id).await? {
                println!("Deleted '{id}'.");
            } else {
                anyhow::bail!("no document registered as '{id}'");
            }
        }
        Commands::Serve => {
            server::run_server(cfg, pipeline).await?;
        }
    }

    Ok(())
}
