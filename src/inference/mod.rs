//! Inference client: HTTP client for a locally hosted LLM server.
//!
//! This module handles all communication with the inference backend:
//! - Model listing
//! - Batch text generation
//! - Streamed text generation over newline-delimited JSON
//! - Configuration loading from `assistant-gm.yaml`
//!
//! Backends speak one of several incompatible wire dialects. The dialect is
//! an explicit configuration value; each has its own implementation behind
//! the `TextGenerator` trait.

pub mod backends;
pub mod client;
pub mod config;
pub mod dialect;
pub mod errors;
pub mod streaming;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use backends::TextGenerator;
pub use client::InferenceClient;
pub use config::{ClientConfig, EndpointConfig, TimeoutConfig};
pub use dialect::Dialect;
pub use errors::InferenceError;
pub use streaming::{ChunkStream, LineBuffer, StreamLine};
pub use types::{GenerationRequest, ModelDescriptor};
