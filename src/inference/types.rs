//! Shared types for the inference client.
//!
//! The portable types (`ModelDescriptor`, `GenerationRequest`) are what callers
//! see. The wire types below mirror each dialect's JSON shapes and are used for
//! request building and response parsing only.

use serde::{Deserialize, Serialize};

use super::streaming::StreamLine;

// ─── Portable Types ──────────────────────────────────────────────────────────

/// A model the backend can generate with. Only the identifier is load-bearing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The portable part of a generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

// ─── Dialect A: text-generation-webui ────────────────────────────────────────

/// Entry of the bare array returned by `GET /api/v1/models`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebuiModelEntry {
    pub name: String,
}

/// Request body for `POST /api/v1/generate`.
///
/// Everything except `model` and `prompt` is a fixed sampling default the
/// backend requires to be present.
#[derive(Debug, Clone, Serialize)]
pub struct WebuiGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_new_tokens: u32,
    pub preset: &'static str,
    pub do_sample: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub typical_p: f32,
    pub epsilon_cutoff: f32,
    pub eta_cutoff: f32,
    pub tfs: f32,
    pub top_a: f32,
    pub repetition_penalty: f32,
    pub top_k: u32,
    pub min_length: u32,
    pub no_repeat_ngram_size: u32,
    pub num_beams: u32,
    pub penalty_alpha: f32,
    pub length_penalty: f32,
    pub early_stopping: bool,
    pub mirostat_mode: u32,
    pub mirostat_tau: f32,
    pub mirostat_eta: f32,
    pub seed: i64,
    pub add_bos_token: bool,
    pub truncation_length: u32,
    pub ban_eos_token: bool,
    pub skip_special_tokens: bool,
    pub stopping_strings: Vec<String>,
}

impl<'a> WebuiGenerateRequest<'a> {
    pub fn new(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            prompt,
            max_new_tokens: 250,
            preset: "None",
            do_sample: true,
            temperature: 0.7,
            top_p: 0.1,
            typical_p: 1.0,
            epsilon_cutoff: 0.0,
            eta_cutoff: 0.0,
            tfs: 1.0,
            top_a: 0.0,
            repetition_penalty: 1.18,
            top_k: 40,
            min_length: 0,
            no_repeat_ngram_size: 0,
            num_beams: 1,
            penalty_alpha: 0.0,
            length_penalty: 1.0,
            early_stopping: false,
            mirostat_mode: 0,
            mirostat_tau: 5.0,
            mirostat_eta: 0.1,
            seed: -1,
            add_bos_token: true,
            truncation_length: 2048,
            ban_eos_token: false,
            skip_special_tokens: true,
            stopping_strings: Vec::new(),
        }
    }
}

/// Response body of `POST /api/v1/generate`: `{"results":[{"text":...}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebuiGenerateResponse {
    #[serde(default)]
    pub results: Option<Vec<WebuiResult>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebuiResult {
    #[serde(default)]
    pub text: Option<String>,
}

// ─── Dialect B: OpenAI-compatible completions ────────────────────────────────

/// Response body of `GET /v1/models`: `{"data":[{"id":...}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiModelList {
    pub data: Vec<OpenAiModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiModel {
    pub id: String,
}

/// Request body for `POST /v1/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            prompt,
            max_tokens: 250,
            temperature: 0.7,
            stream: false,
        }
    }
}

/// Response body of `POST /v1/completions`: `{"choices":[{"text":...}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<CompletionChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub text: Option<String>,
}

// ─── Dialect C: Ollama ───────────────────────────────────────────────────────

/// Response body of `GET /ollama/api/tags`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagsResponse {
    pub models: Vec<OllamaTagModel>,
}

/// Raw model entry from the tags API. Size and digest are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTagModel {
    pub name: String,
}

/// Request body for `POST /ollama/api/generate`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaGenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

/// Non-streaming response body of `POST /ollama/api/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaGenerateResponse {
    #[serde(default)]
    pub response: Option<String>,
}

/// One NDJSON line of a streaming generate response.
///
/// The final line carries `done: true` and usually an empty `response` plus
/// timing statistics, which are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaStreamLine {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
}

impl StreamLine for OllamaStreamLine {
    fn into_text(self) -> Option<String> {
        self.response
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webui_request_carries_sampling_defaults() {
        let req = WebuiGenerateRequest::new("m", "Describe a tavern");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["prompt"], "Describe a tavern");
        assert_eq!(json["max_new_tokens"], 250);
        assert_eq!(json["top_k"], 40);
        assert_eq!(json["seed"], -1);
        assert_eq!(json["truncation_length"], 2048);
        assert_eq!(json["preset"], "None");
        assert_eq!(json["stopping_strings"], serde_json::json!([]));
    }

    #[test]
    fn test_completion_request_is_not_streaming() {
        let req = CompletionRequest::new("m1", "hi");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 250);
    }

    #[test]
    fn test_webui_response_without_results_parses_to_none() {
        let resp: WebuiGenerateResponse = serde_json::from_str(r#"{"detail":"x"}"#).unwrap();
        assert!(resp.results.is_none());
    }

    #[test]
    fn test_ollama_stream_line_text() {
        let line: OllamaStreamLine =
            serde_json::from_str(r#"{"model":"m","response":"Hel","done":false}"#).unwrap();
        assert_eq!(line.into_text().as_deref(), Some("Hel"));

        let last: OllamaStreamLine =
            serde_json::from_str(r#"{"model":"m","done":true,"total_duration":12}"#).unwrap();
        assert!(last.into_text().is_none());
    }
}
