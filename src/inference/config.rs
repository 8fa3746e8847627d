//! Client configuration loading and persistence.
//!
//! The deployment config lives in `assistant-gm.yaml`: backend URL, bearer
//! token, wire dialect, selected model, and timeouts. String values may
//! reference environment variables as `${VAR}` or `${VAR:-default}`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::dialect::Dialect;
use super::errors::InferenceError;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "assistant-gm.yaml";

/// Environment variable holding an explicit config path.
pub const CONFIG_PATH_ENV: &str = "ASSISTANT_GM_CONFIG";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";

// ─── Endpoint ────────────────────────────────────────────────────────────────

/// Where to send requests and how to authenticate them.
///
/// Immutable once built; a new endpoint means a new client.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    base_url: String,
    auth_token: String,
}

impl EndpointConfig {
    /// Build an endpoint. Trailing slashes are trimmed from `base_url` so that
    /// joining with an absolute path never produces `//`.
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            auth_token: auth_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Full URL for an absolute API path such as `/v1/models`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &redacted(&self.auth_token))
            .finish()
    }
}

/// Placeholder printed instead of a bearer token.
fn redacted(token: &str) -> &'static str {
    if token.is_empty() {
        "<none>"
    } else {
        "<redacted>"
    }
}

// ─── Timeouts ────────────────────────────────────────────────────────────────

/// Transport timeouts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// TCP connect timeout for every request.
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    /// Total timeout for listing and batch generation.
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
    /// Longest silence tolerated between stream reads. `0` disables it.
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

fn default_connect_secs() -> u64 {
    5
}
fn default_request_secs() -> u64 {
    120
}
fn default_idle_secs() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            request_secs: default_request_secs(),
            idle_secs: default_idle_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn idle(&self) -> Option<Duration> {
        (self.idle_secs > 0).then(|| Duration::from_secs(self.idle_secs))
    }
}

// ─── Client config ───────────────────────────────────────────────────────────

/// Top-level configuration (mirrors `assistant-gm.yaml`).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub dialect: Dialect,
    /// Selected model id. Empty until the first successful model listing.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: String::new(),
            dialect: Dialect::default(),
            model: String::new(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &redacted(&self.auth_token))
            .field("dialect", &self.dialect)
            .field("model", &self.model)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl ClientConfig {
    pub fn endpoint(&self) -> EndpointConfig {
        EndpointConfig::new(&self.base_url, &self.auth_token)
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `ASSISTANT_GM_CONFIG` first, then walks upward from `start` looking
/// for `assistant-gm.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, InferenceError> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        let candidate = PathBuf::from(expand_tilde(&explicit));
        if candidate.is_file() {
            return Ok(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_PATH_ENV} points at a missing file");
    }

    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| InferenceError::ConfigError {
            reason: format!("could not find {CONFIG_FILE_NAME}"),
        })
}

/// Load and parse a config file, interpolating environment variables first.
pub fn load_config(path: &Path) -> Result<ClientConfig, InferenceError> {
    let raw = std::fs::read_to_string(path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;

    parse_config(&raw)
}

/// Parse config YAML text. An empty document yields the defaults.
pub fn parse_config(raw: &str) -> Result<ClientConfig, InferenceError> {
    let interpolated = interpolate_env_vars(raw);
    if interpolated.trim().is_empty() {
        return Ok(ClientConfig::default());
    }

    serde_yaml::from_str(&interpolated).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to parse config: {e}"),
    })
}

/// Load the config found from `start`, or fall back to defaults.
pub fn load_config_or_default(start: &Path) -> ClientConfig {
    let path = match find_config_path(start) {
        Ok(path) => path,
        Err(_) => {
            tracing::info!("no {CONFIG_FILE_NAME} found, using defaults");
            return ClientConfig::default();
        }
    };

    match load_config(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), dialect = %config.dialect, "loaded config");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            ClientConfig::default()
        }
    }
}

/// Write the config to `path` atomically (temp file + rename).
pub fn save_config(path: &Path, config: &ClientConfig) -> Result<(), InferenceError> {
    let content = serde_yaml::to_string(config).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to serialize config: {e}"),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| InferenceError::ConfigError {
            reason: format!("failed to create {}: {e}", parent.display()),
        })?;
    }

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, content).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to write {}: {e}", tmp_path.display()),
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| InferenceError::ConfigError {
        reason: format!("failed to replace {}: {e}", path.display()),
    })?;

    tracing::debug!(path = %path.display(), "saved config");
    Ok(())
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid regex")
    })
}

/// Replace `${VAR}` and `${VAR:-default}`. Unset variables without a default
/// become empty; defaults get `~` expanded.
fn interpolate_env_vars(input: &str) -> String {
    var_pattern()
        .replace_all(input, |caps: &Captures<'_>| match std::env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => caps
                .get(2)
                .map(|default| expand_tilde(default.as_str()))
                .unwrap_or_default(),
        })
        .into_owned()
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
        _ => path.to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let endpoint = EndpointConfig::new("http://localhost:3000//", "tok");
        assert_eq!(endpoint.base_url(), "http://localhost:3000");
        assert_eq!(endpoint.url("/v1/models"), "http://localhost:3000/v1/models");
        assert_eq!(endpoint.auth_token(), "tok");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig {
            auth_token: "sk-very-secret".into(),
            ..ClientConfig::default()
        };
        let debug = format!("{config:?} {:?}", config.endpoint());
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("http://localhost:3000"));
    }

    #[test]
    fn test_timeouts_idle_zero_disables() {
        let mut timeouts = TimeoutConfig::default();
        assert_eq!(timeouts.idle(), Some(Duration::from_secs(60)));
        timeouts.idle_secs = 0;
        assert!(timeouts.idle().is_none());
    }

    #[test]
    fn test_parse_config_defaults() {
        let config = parse_config("dialect: ollama\n").unwrap();
        assert_eq!(config.dialect, Dialect::Ollama);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.auth_token, "");
        assert_eq!(config.model, "");
        assert_eq!(config.timeouts, TimeoutConfig::default());
    }

    #[test]
    fn test_parse_empty_config_is_default() {
        assert_eq!(parse_config("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_parse_config_rejects_unknown_dialect() {
        let err = parse_config("dialect: kobold\n").unwrap_err();
        assert!(matches!(err, InferenceError::ConfigError { .. }));
    }

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__ASSISTANT_GM_UNSET__");
        let result = interpolate_env_vars("token: ${__ASSISTANT_GM_UNSET__:-fallback}");
        assert_eq!(result, "token: fallback");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__ASSISTANT_GM_TOKEN__", "secret");
        let result = interpolate_env_vars("auth_token: ${__ASSISTANT_GM_TOKEN__:-none}");
        assert_eq!(result, "auth_token: secret");
        std::env::remove_var("__ASSISTANT_GM_TOKEN__");
    }

    #[test]
    fn test_interpolate_unset_without_default_is_empty() {
        std::env::remove_var("__ASSISTANT_GM_MISSING__");
        assert_eq!(interpolate_env_vars("a${__ASSISTANT_GM_MISSING__}b"), "ab");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain text with $dollar and {braces}";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/campaign");
        assert!(!result.starts_with('~'), "tilde should be expanded");
        assert!(result.ends_with("/campaign"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = ClientConfig {
            base_url: "http://gpu-box:11434".into(),
            auth_token: "jwt".into(),
            dialect: Dialect::Ollama,
            model: "llama3:8b".into(),
            timeouts: TimeoutConfig {
                connect_secs: 2,
                request_secs: 30,
                idle_secs: 0,
            },
        };

        save_config(&path, &config).unwrap();
        assert!(!path.with_extension("yaml.tmp").exists());
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_find_config_path_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "model: x\n").unwrap();

        let found = find_config_path(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }
}
