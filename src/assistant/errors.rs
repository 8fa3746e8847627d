//! Assistant error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors surfaced by the assistant layer.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The backend call failed.
    #[error("{0}")]
    Inference(#[from] InferenceError),

    /// The backend answered with an empty model list.
    #[error("no AI models found; check the API URL and token")]
    NoModels,

    /// No inference client has been built yet.
    #[error("API not initialized")]
    NotInitialized,

    /// The requested model is not in the last fetched list.
    #[error("unknown model '{model}'")]
    UnknownModel { model: String },

    /// Persisting the configuration failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}
