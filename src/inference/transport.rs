//! Authenticated HTTP plumbing shared by every dialect.
//!
//! Attaches the bearer token, maps `reqwest` failures onto
//! [`InferenceError`], rejects non-2xx statuses, and decodes JSON bodies.
//! Dialect modules only decide paths and shapes.

use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::config::{EndpointConfig, TimeoutConfig};
use super::errors::InferenceError;

/// Longest error body kept in an `HttpError`.
const MAX_ERROR_BODY: usize = 2048;

/// HTTP transport bound to one endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: EndpointConfig,
    timeouts: TimeoutConfig,
    /// Client for listing and batch generation (total request timeout).
    http: HttpClient,
    /// Client for streamed generation: connect timeout only, silence is
    /// policed by the stream reader's idle timeout.
    http_stream: HttpClient,
}

impl HttpTransport {
    pub fn new(endpoint: EndpointConfig, timeouts: TimeoutConfig) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(timeouts.connect())
            .timeout(timeouts.request())
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: endpoint.base_url().to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let http_stream = HttpClient::builder()
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: endpoint.base_url().to_string(),
                reason: format!("failed to build streaming HTTP client: {e}"),
            })?;

        Ok(Self {
            endpoint,
            timeouts,
            http,
            http_stream,
        })
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }

    /// Authenticated GET, decoded as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, InferenceError> {
        let url = self.endpoint.url(path);
        tracing::debug!(url = %url, "GET");
        let response = self.send(self.http.get(&url), &url).await?;
        self.decode_json(response, &url).await
    }

    /// Authenticated POST with a JSON body, response decoded as `T`.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, InferenceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint.url(path);
        tracing::debug!(url = %url, "POST");
        let response = self.send(self.http.post(&url).json(body), &url).await?;
        self.decode_json(response, &url).await
    }

    /// Authenticated POST whose response body will be consumed incrementally.
    ///
    /// Returns once the status line and headers are in; the status has
    /// already been checked.
    pub async fn post_streaming<B>(&self, path: &str, body: &B) -> Result<Response, InferenceError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.endpoint.url(path);
        tracing::debug!(url = %url, "POST (streaming)");
        self.send(
            self.http_stream
                .post(&url)
                .json(body)
                .header("Accept", "application/x-ndjson"),
            &url,
        )
        .await
    }

    /// Lightweight reachability check: any 2xx on `path` within the connect
    /// timeout counts as healthy.
    pub async fn probe(&self, path: &str) -> bool {
        let url = self.endpoint.url(path);
        match self
            .http
            .get(&url)
            .bearer_auth(self.endpoint.auth_token())
            .timeout(self.timeouts.connect())
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "health probe failed");
                false
            }
        }
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, InferenceError> {
        let response = request
            .bearer_auth(self.endpoint.auth_token())
            .send()
            .await
            .map_err(|e| self.map_send_error(e, url))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_body(&mut body);
            tracing::warn!(url = %url, status = status.as_u16(), "backend returned error status");
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    fn map_send_error(&self, e: reqwest::Error, url: &str) -> InferenceError {
        if e.is_timeout() {
            self.timeout_error(e.is_connect())
        } else {
            InferenceError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    /// A connect timeout reports the connect limit; anything later in the
    /// exchange reports the total request limit.
    fn timeout_error(&self, during_connect: bool) -> InferenceError {
        let duration_secs = if during_connect {
            self.timeouts.connect_secs
        } else {
            self.timeouts.request_secs
        };
        InferenceError::Timeout { duration_secs }
    }

    async fn decode_json<T: DeserializeOwned>(
        &self,
        response: Response,
        url: &str,
    ) -> Result<T, InferenceError> {
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error(false)
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: url.to_string(),
                    reason: format!("failed to read response body: {e}"),
                }
            }
        })?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(url = %url, body = %body, "unexpected response body");
            InferenceError::MalformedResponse {
                reason: format!("invalid JSON from {url}: {e}"),
            }
        })
    }
}

fn truncate_body(body: &mut String) {
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&idx| body.is_char_boundary(idx))
            .unwrap_or(0);
        body.truncate(cut);
    }
}
