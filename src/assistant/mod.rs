//! Assistant: the game-master-facing layer on top of the inference client.
//!
//! Submodules:
//! - `enricher`: `@assistant[...]` inline markup parsing and HTML rendering
//! - `journal`: journal lookup, placeholder spans, in-memory journal store
//! - `errors`: assistant-level error types
//!
//! [`Assistant`] owns the configuration and the client built from it. It is
//! constructed and passed around explicitly; several can coexist.

pub mod enricher;
pub mod errors;
pub mod journal;

use std::path::PathBuf;

use futures::StreamExt;

use crate::inference::config::save_config;
use crate::inference::{ClientConfig, InferenceClient, ModelDescriptor};

pub use enricher::{compose_prompt, find_inline_prompts, InlinePrompt};
pub use errors::AssistantError;
pub use journal::{Journal, JournalSource, PlaceholderSink};

/// Outcome of refreshing the model list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUpdate {
    pub models: Vec<ModelDescriptor>,
    /// The model selected after reconciliation.
    pub selected: String,
    /// Whether the selection differs from the configured one.
    pub changed: bool,
}

/// Pick the model to use given the backend's list and the current selection.
///
/// Keeps `current` when the backend offers it; otherwise falls back to the
/// first model. Returns `None` for an empty list.
pub fn reconcile_selection(models: &[ModelDescriptor], current: &str) -> Option<(String, bool)> {
    if !current.is_empty() && models.iter().any(|m| m.id == current) {
        return Some((current.to_string(), false));
    }
    models.first().map(|m| (m.id.clone(), true))
}

/// The assistant: configuration, client, and the last known model list.
#[derive(Debug)]
pub struct Assistant {
    config: ClientConfig,
    /// Where selection changes are persisted. `None` keeps them in memory.
    config_path: Option<PathBuf>,
    client: Option<InferenceClient>,
    models: Vec<ModelDescriptor>,
}

impl Assistant {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            config_path: None,
            client: None,
            models: Vec::new(),
        }
    }

    /// Persist configuration changes (model selection) to `path`.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn selected_model(&self) -> &str {
        &self.config.model
    }

    /// Models from the last successful refresh.
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn client(&self) -> Option<&InferenceClient> {
        self.client.as_ref()
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Build (or rebuild) the inference client from the current configuration.
    pub fn initialize_api(&mut self) -> Result<&InferenceClient, AssistantError> {
        let client = InferenceClient::from_config(&self.config)?;
        Ok(self.client.insert(client))
    }

    /// Replace the configuration. The client is rebuilt and the model list
    /// cleared, since neither is valid for another endpoint.
    pub fn reconfigure(&mut self, config: ClientConfig) -> Result<(), AssistantError> {
        self.config = config;
        self.models.clear();
        self.initialize_api()?;
        Ok(())
    }

    /// Initialize the client and fetch the model list.
    pub async fn ready(&mut self) -> Result<ModelUpdate, AssistantError> {
        self.initialize_api()?;
        self.update_available_models().await
    }

    fn client_or_init(&mut self) -> Result<&InferenceClient, AssistantError> {
        if self.client.is_none() {
            tracing::warn!("API not initialized, initializing now");
            self.initialize_api()?;
        }
        self.client.as_ref().ok_or(AssistantError::NotInitialized)
    }

    // ─── Models ──────────────────────────────────────────────────────────

    /// Fetch the model list and reconcile the selected model against it.
    ///
    /// An empty list is reported as [`AssistantError::NoModels`] and leaves
    /// the selection untouched. A changed selection is saved when a config
    /// path is set.
    pub async fn update_available_models(&mut self) -> Result<ModelUpdate, AssistantError> {
        let models = self.client_or_init()?.list_models().await?;

        let Some((selected, changed)) = reconcile_selection(&models, &self.config.model) else {
            tracing::error!("no AI models found");
            self.models.clear();
            return Err(AssistantError::NoModels);
        };

        self.models = models.clone();
        if changed {
            tracing::info!(
                previous = %self.config.model,
                selected = %selected,
                "selected model not offered by backend, switching"
            );
            self.config.model = selected.clone();
            self.persist()?;
        }

        Ok(ModelUpdate {
            models,
            selected,
            changed,
        })
    }

    /// Select a model from the last fetched list.
    pub fn select_model(&mut self, model: &str) -> Result<(), AssistantError> {
        if !self.models.iter().any(|m| m.id == model) {
            return Err(AssistantError::UnknownModel {
                model: model.to_string(),
            });
        }
        self.config.model = model.to_string();
        self.persist()
    }

    fn persist(&self) -> Result<(), AssistantError> {
        match &self.config_path {
            Some(path) => save_config(path, &self.config).map_err(|e| AssistantError::ConfigError {
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }

    // ─── Inline enrichment ───────────────────────────────────────────────

    /// Generate text for the prompt of one markup occurrence.
    pub async fn generate_for(
        &self,
        inline: &InlinePrompt,
        journals: &impl JournalSource,
    ) -> Result<String, AssistantError> {
        let client = self.client.as_ref().ok_or(AssistantError::NotInitialized)?;

        let journal_content = inline.journal.as_deref().and_then(|name| {
            let content = journals.journal_content(name);
            if content.is_none() {
                tracing::warn!(journal = %name, "journal not found");
            }
            content
        });
        let prompt = compose_prompt(&inline.prompt, journal_content);

        Ok(client.generate_text(&self.config.model, &prompt).await?)
    }

    /// Replace every `@assistant[...]` occurrence in `document` with rendered
    /// generated text, or with an error span when generation fails.
    ///
    /// Occurrences are generated one after another, in document order.
    pub async fn enrich(&self, document: &str, journals: &impl JournalSource) -> String {
        let prompts = find_inline_prompts(document);
        if prompts.is_empty() {
            return document.to_string();
        }

        let mut out = String::with_capacity(document.len());
        let mut cursor = 0;

        for inline in &prompts {
            out.push_str(&document[cursor..inline.range.start]);
            let rendered = match self.generate_for(inline, journals).await {
                Ok(text) => enricher::render_generated(&text),
                Err(e) => {
                    tracing::error!(error = %e, prompt = %inline.prompt, "error generating text");
                    enricher::render_error(&e.to_string())
                }
            };
            out.push_str(&rendered);
            cursor = inline.range.end;
        }

        out.push_str(&document[cursor..]);
        out
    }

    // ─── Placeholder streaming ───────────────────────────────────────────

    /// Generate text for `prompt` into placeholder `placeholder_id`.
    ///
    /// With a streaming dialect the placeholder is rewritten with the
    /// accumulated text after every chunk; otherwise once with the complete
    /// text. On failure the placeholder shows the error and the error is
    /// returned. Returns the generated text.
    pub async fn generate_into_placeholder(
        &mut self,
        prompt: &str,
        placeholder_id: &str,
        sink: &mut impl PlaceholderSink,
    ) -> Result<String, AssistantError> {
        let model = self.config.model.clone();
        let client = self.client_or_init()?;

        let result = if client.supports_streaming() {
            stream_into(client, &model, prompt, placeholder_id, sink).await
        } else {
            client
                .generate_text(&model, prompt)
                .await
                .map(|text| {
                    sink.update_placeholder(placeholder_id, &enricher::escape_with_breaks(&text));
                    text
                })
                .map_err(AssistantError::from)
        };

        if let Err(e) = &result {
            tracing::error!(error = %e, placeholder = %placeholder_id, "error generating text");
            let message = format!("Error generating text: {e}");
            sink.update_placeholder(placeholder_id, &enricher::escape_with_breaks(&message));
        }
        result
    }
}

async fn stream_into(
    client: &InferenceClient,
    model: &str,
    prompt: &str,
    placeholder_id: &str,
    sink: &mut impl PlaceholderSink,
) -> Result<String, AssistantError> {
    let mut chunks = client.generate_text_stream(model, prompt).await?;
    let mut text = String::new();

    while let Some(chunk) = chunks.next().await {
        text.push_str(&chunk?);
        if !sink.update_placeholder(placeholder_id, &enricher::escape_with_breaks(&text)) {
            tracing::warn!(placeholder = %placeholder_id, "placeholder not found, stopping stream");
            break;
        }
    }

    Ok(text)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn models(ids: &[&str]) -> Vec<ModelDescriptor> {
        ids.iter().map(|id| ModelDescriptor::new(*id)).collect()
    }

    #[test]
    fn test_reconcile_keeps_offered_model() {
        let got = reconcile_selection(&models(&["a", "b"]), "b");
        assert_eq!(got, Some(("b".to_string(), false)));
    }

    #[test]
    fn test_reconcile_falls_back_to_first() {
        assert_eq!(
            reconcile_selection(&models(&["a", "b"]), "gone"),
            Some(("a".to_string(), true))
        );
        assert_eq!(
            reconcile_selection(&models(&["a"]), ""),
            Some(("a".to_string(), true))
        );
    }

    #[test]
    fn test_reconcile_empty_list() {
        assert!(reconcile_selection(&[], "a").is_none());
    }

    #[tokio::test]
    async fn test_enrich_without_client_renders_error() {
        let assistant = Assistant::new(ClientConfig::default());
        let out = assistant
            .enrich("Before @assistant[Hi] after", &Journal::new())
            .await;
        assert_eq!(
            out,
            r#"Before <span class="assistant-error">Error: API not initialized</span> after"#
        );
    }

    #[tokio::test]
    async fn test_enrich_without_markup_is_identity() {
        let assistant = Assistant::new(ClientConfig::default());
        let doc = "<p>No prompts here.</p>";
        assert_eq!(assistant.enrich(doc, &Journal::new()).await, doc);
    }

    #[test]
    fn test_select_model_requires_known_model() {
        let mut assistant = Assistant::new(ClientConfig::default());
        let err = assistant.select_model("x").unwrap_err();
        assert!(matches!(err, AssistantError::UnknownModel { .. }));
    }

    #[test]
    fn test_reconfigure_rebuilds_client() {
        let mut assistant = Assistant::new(ClientConfig::default());
        assert!(assistant.client().is_none());
        let config = ClientConfig {
            base_url: "http://other:1234/".into(),
            ..ClientConfig::default()
        };
        assistant.reconfigure(config).unwrap();
        assert_eq!(assistant.client().unwrap().base_url(), "http://other:1234");
    }
}
