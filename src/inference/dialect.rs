//! Backend wire dialects.
//!
//! Each deployment targets exactly one dialect. They are mutually incompatible
//! and never auto-negotiated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which backend API the client speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// text-generation-webui style `/api/v1/*` endpoints. No streaming.
    #[default]
    TextGenerationWebui,
    /// OpenAI-compatible `/v1/completions`. No streaming.
    #[serde(rename = "openai_completions")]
    OpenAiCompletions,
    /// Ollama API proxied under `/ollama/api/*`, with NDJSON streaming.
    Ollama,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [
        Dialect::TextGenerationWebui,
        Dialect::OpenAiCompletions,
        Dialect::Ollama,
    ];

    /// Path of the model-listing endpoint.
    pub fn models_path(self) -> &'static str {
        match self {
            Dialect::TextGenerationWebui => "/api/v1/models",
            Dialect::OpenAiCompletions => "/v1/models",
            Dialect::Ollama => "/ollama/api/tags",
        }
    }

    /// Path of the text-generation endpoint (batch and, where supported, stream).
    pub fn generate_path(self) -> &'static str {
        match self {
            Dialect::TextGenerationWebui => "/api/v1/generate",
            Dialect::OpenAiCompletions => "/v1/completions",
            Dialect::Ollama => "/ollama/api/generate",
        }
    }

    pub fn supports_streaming(self) -> bool {
        matches!(self, Dialect::Ollama)
    }

    /// The configuration name of this dialect.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::TextGenerationWebui => "text_generation_webui",
            Dialect::OpenAiCompletions => "openai_completions",
            Dialect::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "text_generation_webui" | "webui" | "a" => Ok(Dialect::TextGenerationWebui),
            "openai_completions" | "openai" | "b" => Ok(Dialect::OpenAiCompletions),
            "ollama" | "c" => Ok(Dialect::Ollama),
            other => Err(format!(
                "unknown dialect '{other}' (expected one of: text_generation_webui, openai_completions, ollama)"
            )),
        }
    }
}
