//! Inference error types.
//!
//! All errors implement `std::error::Error` via `thiserror`. Two classes matter
//! to callers: transport failures (network, timeouts, non-2xx status, broken
//! streams) and malformed responses (a body that does not match the configured
//! dialect's shape). Neither is retried here.

use thiserror::Error;

use super::dialect::Dialect;

/// Errors that can occur during inference operations.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// TCP/HTTP connection to the backend failed.
    #[error("connection failed to {endpoint}: {reason}")]
    ConnectionFailed { endpoint: String, reason: String },

    /// The backend did not respond (or went silent mid-stream) within the
    /// configured timeout.
    #[error("inference timeout after {duration_secs}s")]
    Timeout { duration_secs: u64 },

    /// Non-2xx HTTP response from the backend.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The connection broke after streaming had begun.
    #[error("stream error: {reason}")]
    StreamError { reason: String },

    /// The response body does not match the shape expected for the dialect.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// The configured dialect has no streaming endpoint.
    #[error("dialect '{dialect}' does not support streaming")]
    StreamingUnsupported { dialect: Dialect },

    /// Configuration loading or validation error.
    #[error("config error: {reason}")]
    ConfigError { reason: String },
}

impl InferenceError {
    /// Whether this error belongs to the transport class (network failure,
    /// timeout, non-success status, or a stream cut short).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InferenceError::ConnectionFailed { .. }
                | InferenceError::Timeout { .. }
                | InferenceError::HttpError { .. }
                | InferenceError::StreamError { .. }
        )
    }

    /// Whether the backend answered with a body of the wrong shape.
    pub fn is_malformed(&self) -> bool {
        matches!(self, InferenceError::MalformedResponse { .. })
    }

    /// The HTTP status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            InferenceError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Extract the error body text, if this is an `HttpError`.
    pub fn error_body(&self) -> Option<&str> {
        match self {
            InferenceError::HttpError { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_is_transport_with_status() {
        let err = InferenceError::HttpError {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(err.is_transport());
        assert!(!err.is_malformed());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_stream_and_timeout_are_transport_without_status() {
        let stream = InferenceError::StreamError {
            reason: "connection reset".into(),
        };
        let timeout = InferenceError::Timeout { duration_secs: 60 };
        assert!(stream.is_transport());
        assert!(timeout.is_transport());
        assert!(stream.status().is_none());
        assert!(timeout.status().is_none());
    }

    #[test]
    fn test_malformed_is_not_transport() {
        let err = InferenceError::MalformedResponse {
            reason: "text not found".into(),
        };
        assert!(err.is_malformed());
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "malformed response: text not found");
    }

    #[test]
    fn test_streaming_unsupported_names_dialect() {
        let err = InferenceError::StreamingUnsupported {
            dialect: Dialect::OpenAiCompletions,
        };
        assert_eq!(
            err.to_string(),
            "dialect 'openai_completions' does not support streaming"
        );
    }

    #[test]
    fn test_error_body_http_error() {
        let err = InferenceError::HttpError {
            status: 500,
            body: "test body".to_string(),
        };
        assert_eq!(err.error_body(), Some("test body"));
    }

    #[test]
    fn test_error_body_non_http() {
        let err = InferenceError::Timeout { duration_secs: 5 };
        assert!(err.error_body().is_none());
    }
}
