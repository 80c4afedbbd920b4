//! Embedding and completion provider abstraction.
//!
//! Defines the [`EmbeddingProvider`] and [`CompletionProvider`] traits and the
//! concrete [`OpenAiProvider`] that implements both against the OpenAI HTTP
//! API. Provider failures are classified by HTTP status into the typed
//! pipeline error kinds:
//!
//! - 401 / 403 → [`PipelineError::ProviderAuth`]
//! - 429 → [`PipelineError::ProviderQuota`]
//! - any other non-success status, transport error, or malformed response →
//!   [`PipelineError::ProviderService`]
//!
//! There is no retry policy: each call is bounded by the configured request
//! timeout and a failure is terminal for that invocation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::ProviderConfig;
use crate::error::{PipelineError, Result};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Generates one embedding vector per input text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one vector per text in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut results = self.embed_batch(&texts).await?;
        if results.is_empty() {
            return Err(PipelineError::ProviderService(
                "provider returned an empty embedding response".to_string(),
            ));
        }
        Ok(results.swap_remove(0))
    }
}

/// Produces a text completion for an assembled prompt.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Classify a non-success provider response into a typed error kind.
pub fn classify_status(status: u16, detail: String) -> PipelineError {
    match status {
        401 | 403 => PipelineError::ProviderAuth(detail),
        429 => PipelineError::ProviderQuota(detail),
        _ => PipelineError::ProviderService(detail),
    }
}

/// OpenAI-backed provider implementing both embedding and completion.
///
/// Reads the API key from the `OPENAI_API_KEY` environment variable unless
/// one is supplied explicitly. Model names, sampling settings, and the
/// request timeout come from [`ProviderConfig`].
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, config: ProviderConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(PipelineError::ProviderAuth(
                "API key must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::ProviderService(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Build a provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env(config: ProviderConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PipelineError::ProviderAuth("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key, config)
    }

    async fn classify_response(response: reqwest::Response) -> PipelineError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        error!(status, detail = %detail, "provider API error");
        classify_status(status, format!("API returned {status}: {detail}"))
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ── Provider implementations ───────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            batch_size = texts.len(),
            model = %self.config.embedding_model,
            "embedding batch"
        );

        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::ProviderService(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::classify_response(response).await);
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ProviderService(format!("malformed response: {e}")))?;

        if body.data.len() != texts.len() {
            return Err(PipelineError::ProviderService(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            model = %self.config.chat_model,
            prompt_chars = prompt.chars().count(),
            "requesting completion"
        );

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::ProviderService(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::classify_response(response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ProviderService(format!("malformed response: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                PipelineError::ProviderService("completion response had no choices".to_string())
            })
    }
}
