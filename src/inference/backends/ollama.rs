use async_trait::async_trait;

use super::TextGenerator;
use crate::inference::dialect::Dialect;
use crate::inference::errors::InferenceError;
use crate::inference::streaming::{ndjson_chunks, ChunkStream};
use crate::inference::transport::HttpTransport;
use crate::inference::types::{
    ModelDescriptor, OllamaGenerateRequest, OllamaGenerateResponse, OllamaStreamLine,
    OllamaTagsResponse,
};

/// Ollama backend (proxied under `/ollama`), the only dialect that streams.
#[derive(Debug, Clone)]
pub struct Ollama {
    transport: HttpTransport,
}

impl Ollama {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TextGenerator for Ollama {
    fn dialect(&self) -> Dialect {
        Dialect::Ollama
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        let tags: OllamaTagsResponse = self.transport.get_json(Dialect::Ollama.models_path()).await?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelDescriptor::new(m.name))
            .collect())
    }

    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let body = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
        };
        let response: OllamaGenerateResponse = self
            .transport
            .post_json(Dialect::Ollama.generate_path(), &body)
            .await?;

        response
            .response
            .map(|text| text.trim().to_string())
            .ok_or_else(|| InferenceError::MalformedResponse {
                reason: "'response' not found".into(),
            })
    }

    async fn generate_text_stream(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<ChunkStream, InferenceError> {
        let body = OllamaGenerateRequest {
            model,
            prompt,
            stream: true,
        };
        let response = self
            .transport
            .post_streaming(Dialect::Ollama.generate_path(), &body)
            .await?;

        Ok(ndjson_chunks::<OllamaStreamLine, _, _, _>(
            response.bytes_stream(),
            self.transport.timeouts().idle(),
        ))
    }
}
