//! One implementation per wire dialect behind a common capability trait.
//!
//! Callers pick a [`Dialect`] at configuration time; [`for_dialect`] returns
//! the matching implementation. Streaming is optional: dialects without a
//! streaming endpoint keep the default `generate_text_stream`, which fails
//! with [`InferenceError::StreamingUnsupported`].

mod ollama;
mod openai_completions;
mod text_generation_webui;

use async_trait::async_trait;

pub use ollama::Ollama;
pub use openai_completions::OpenAiCompletions;
pub use text_generation_webui::TextGenerationWebui;

use super::dialect::Dialect;
use super::errors::InferenceError;
use super::streaming::ChunkStream;
use super::transport::HttpTransport;
use super::types::ModelDescriptor;

/// What a backend can do.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Models the backend offers, in backend order. An empty list is not an
    /// error.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError>;

    /// Generate the complete text for `prompt`, trimmed.
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;

    /// Start a streamed generation. The status is checked before returning;
    /// chunks then arrive through the returned stream.
    async fn generate_text_stream(
        &self,
        _model: &str,
        _prompt: &str,
    ) -> Result<ChunkStream, InferenceError> {
        Err(InferenceError::StreamingUnsupported {
            dialect: self.dialect(),
        })
    }
}

/// Build the backend for `dialect` on top of `transport`.
pub fn for_dialect(dialect: Dialect, transport: HttpTransport) -> Box<dyn TextGenerator> {
    match dialect {
        Dialect::TextGenerationWebui => Box::new(TextGenerationWebui::new(transport)),
        Dialect::OpenAiCompletions => Box::new(OpenAiCompletions::new(transport)),
        Dialect::Ollama => Box::new(Ollama::new(transport)),
    }
}

/// Take the first element's text field, or report which part was missing.
fn first_text<T>(
    items: Option<Vec<T>>,
    list_name: &str,
    text: impl FnOnce(T) -> Option<String>,
) -> Result<String, InferenceError> {
    let first = items
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| InferenceError::MalformedResponse {
            reason: format!("'{list_name}' missing or empty"),
        })?;

    text(first)
        .map(|t| t.trim().to_string())
        .ok_or_else(|| InferenceError::MalformedResponse {
            reason: format!("text not found in '{list_name}[0]'"),
        })
}
