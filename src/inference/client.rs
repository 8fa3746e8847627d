//! Inference client for a locally hosted LLM server.
//!
//! An `InferenceClient` is an ordinary value: build it from a configuration,
//! pass it where it is needed, build a new one when the configuration
//! changes. It holds no mutable state between calls, so concurrent calls on
//! one client are fine; each opens its own connection.

use std::fmt;

use futures::StreamExt;

use super::backends::{self, TextGenerator};
use super::config::{ClientConfig, EndpointConfig, TimeoutConfig};
use super::dialect::Dialect;
use super::errors::InferenceError;
use super::streaming::ChunkStream;
use super::transport::HttpTransport;
use super::types::{GenerationRequest, ModelDescriptor};

/// Client for one backend endpoint speaking one dialect.
pub struct InferenceClient {
    transport: HttpTransport,
    backend: Box<dyn TextGenerator>,
}

impl InferenceClient {
    /// Create a client for `endpoint` speaking `dialect`.
    ///
    /// Does NOT check connectivity; that happens on the first request.
    pub fn new(
        endpoint: EndpointConfig,
        dialect: Dialect,
        timeouts: TimeoutConfig,
    ) -> Result<Self, InferenceError> {
        let transport = HttpTransport::new(endpoint, timeouts)?;
        tracing::info!(
            base_url = %transport.endpoint().base_url(),
            dialect = %dialect,
            "inference client initialized"
        );
        Ok(Self {
            backend: backends::for_dialect(dialect, transport.clone()),
            transport,
        })
    }

    /// Create a client from the deployment configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, InferenceError> {
        Self::new(config.endpoint(), config.dialect, config.timeouts)
    }

    /// Wrap an already-built backend. `transport` is used for health checks.
    pub fn with_backend(transport: HttpTransport, backend: Box<dyn TextGenerator>) -> Self {
        Self { transport, backend }
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    pub fn base_url(&self) -> &str {
        self.transport.endpoint().base_url()
    }

    pub fn supports_streaming(&self) -> bool {
        self.dialect().supports_streaming()
    }

    // ─── Models ──────────────────────────────────────────────────────────

    /// List the backend's models in backend order.
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        tracing::info!(base_url = %self.base_url(), dialect = %self.dialect(), "fetching models");
        let models = self.backend.list_models().await?;
        tracing::info!(count = models.len(), "fetched models");
        Ok(models)
    }

    /// Check if the backend answers its model-listing path.
    ///
    /// Never fails; unreachable or unhealthy backends report `false`.
    pub async fn health_check(&self) -> bool {
        self.transport.probe(self.dialect().models_path()).await
    }

    // ─── Generation (batch) ──────────────────────────────────────────────

    /// Generate text and wait for the complete, trimmed result.
    pub async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        tracing::info!(
            model = %model,
            dialect = %self.dialect(),
            prompt_chars = prompt.chars().count(),
            "generating text"
        );
        let text = self.backend.generate_text(model, prompt).await?;
        tracing::debug!(chars = text.chars().count(), "generation complete");
        Ok(text)
    }

    /// Batch generation for a [`GenerationRequest`].
    pub async fn generate(&self, request: &GenerationRequest) -> Result<String, InferenceError> {
        self.generate_text(&request.model, &request.prompt).await
    }

    // ─── Generation (streaming) ──────────────────────────────────────────

    /// Start a streamed generation.
    ///
    /// A non-success status fails here, before any chunk. After that, chunks
    /// arrive in order through the stream; a broken connection shows up as a
    /// single `Err` item that ends the stream. Drop the stream to cancel.
    pub async fn generate_text_stream(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<ChunkStream, InferenceError> {
        tracing::info!(
            model = %model,
            dialect = %self.dialect(),
            prompt_chars = prompt.chars().count(),
            "starting streamed generation"
        );
        self.backend.generate_text_stream(model, prompt).await
    }

    /// Streamed generation delivered to a callback.
    ///
    /// Calls `on_chunk` once per chunk in arrival order and returns the
    /// concatenated text. On a mid-stream failure the chunks already
    /// delivered stand and the error is returned.
    pub async fn generate_text_stream_with<F>(
        &self,
        model: &str,
        prompt: &str,
        mut on_chunk: F,
    ) -> Result<String, InferenceError>
    where
        F: FnMut(&str),
    {
        let mut chunks = self.generate_text_stream(model, prompt).await?;
        let mut text = String::new();
        let mut count = 0usize;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.inspect_err(|e| {
                tracing::warn!(error = %e, delivered = count, "stream ended with error");
            })?;
            on_chunk(&chunk);
            text.push_str(&chunk);
            count += 1;
        }

        tracing::debug!(chunks = count, chars = text.chars().count(), "stream complete");
        Ok(text)
    }
}

impl fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceClient")
            .field("base_url", &self.base_url())
            .field("dialect", &self.dialect())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
