use async_trait::async_trait;

use super::{first_text, TextGenerator};
use crate::inference::dialect::Dialect;
use crate::inference::errors::InferenceError;
use crate::inference::transport::HttpTransport;
use crate::inference::types::{CompletionRequest, CompletionResponse, ModelDescriptor, OpenAiModelList};

/// OpenAI-compatible completions backend: `data[].id`, `choices[0].text`.
#[derive(Debug, Clone)]
pub struct OpenAiCompletions {
    transport: HttpTransport,
}

impl OpenAiCompletions {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompletions {
    fn dialect(&self) -> Dialect {
        Dialect::OpenAiCompletions
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        let list: OpenAiModelList = self
            .transport
            .get_json(Dialect::OpenAiCompletions.models_path())
            .await?;

        Ok(list.data.into_iter().map(|m| ModelDescriptor::new(m.id)).collect())
    }

    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let body = CompletionRequest::new(model, prompt);
        let response: CompletionResponse = self
            .transport
            .post_json(Dialect::OpenAiCompletions.generate_path(), &body)
            .await?;

        first_text(response.choices, "choices", |c| c.text)
    }
}
