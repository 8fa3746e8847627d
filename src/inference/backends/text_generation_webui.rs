use async_trait::async_trait;

use super::{first_text, TextGenerator};
use crate::inference::dialect::Dialect;
use crate::inference::errors::InferenceError;
use crate::inference::transport::HttpTransport;
use crate::inference::types::{
    ModelDescriptor, WebuiGenerateRequest, WebuiGenerateResponse, WebuiModelEntry,
};

/// text-generation-webui style backend: bare model array, `results[0].text`.
#[derive(Debug, Clone)]
pub struct TextGenerationWebui {
    transport: HttpTransport,
}

impl TextGenerationWebui {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl TextGenerator for TextGenerationWebui {
    fn dialect(&self) -> Dialect {
        Dialect::TextGenerationWebui
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, InferenceError> {
        let entries: Vec<WebuiModelEntry> = self
            .transport
            .get_json(Dialect::TextGenerationWebui.models_path())
            .await?;

        Ok(entries
            .into_iter()
            .map(|entry| ModelDescriptor::new(entry.name))
            .collect())
    }

    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let body = WebuiGenerateRequest::new(model, prompt);
        let response: WebuiGenerateResponse = self
            .transport
            .post_json(Dialect::TextGenerationWebui.generate_path(), &body)
            .await?;

        first_text(response.results, "results", |r| r.text)
    }
}
