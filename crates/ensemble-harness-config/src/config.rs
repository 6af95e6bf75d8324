// crates/ensemble-harness-config/src/config.rs
// ============================================================================
// Module: Ensemble Harness Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then credential overrides are applied from the environment. Missing or
//! invalid configuration fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "ensemble-harness.toml";
/// Environment variable overriding the configuration path.
pub const CONFIG_ENV_VAR: &str = "ENSEMBLE_HARNESS_CONFIG";
/// Environment variable overriding the API username.
pub const USERNAME_ENV_VAR: &str = "BIGML_USERNAME";
/// Environment variable overriding the API key.
pub const API_KEY_ENV_VAR: &str = "BIGML_API_KEY";
/// Environment variable overriding the project id.
pub const PROJECT_ENV_VAR: &str = "BIGML_PROJECT";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV_VAR: &str = "ENSEMBLE_HARNESS_API_URL";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://bigml.io/andromeda/";
/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Minimum request timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum request timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 600_000;
/// Default first delay between status reads.
const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
/// Default cap on the delay between status reads.
const DEFAULT_MAX_DELAY_MS: u64 = 30_000;
/// Maximum multiplier applied to step timeouts.
const MAX_TIMEOUT_SCALE: u32 = 100;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Ensemble harness configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Remote API connection settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Status polling settings.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Local resource file settings.
    #[serde(default)]
    pub resources: ResourcesConfig,
}

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules and
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string without
    /// consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally the process
    /// environment). Empty values are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is set but empty.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Result<Option<String>, ConfigError> {
            match lookup(name) {
                Some(value) if value.trim().is_empty() => {
                    Err(ConfigError::Invalid(format!("{name} must not be empty")))
                }
                other => Ok(other),
            }
        };
        if let Some(username) = read(USERNAME_ENV_VAR)? {
            self.api.username = Some(username);
        }
        if let Some(api_key) = read(API_KEY_ENV_VAR)? {
            self.api.api_key = Some(api_key);
        }
        if let Some(project) = read(PROJECT_ENV_VAR)? {
            self.api.project = Some(project);
        }
        if let Some(base_url) = read(BASE_URL_ENV_VAR)? {
            self.api.base_url = base_url;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.polling.validate()?;
        self.resources.validate()
    }
}

/// Remote API connection settings.
///
/// # Invariants
/// - `username` and `api_key` are either both set or both unset.
/// - `http://` base URLs require `allow_http`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL every resource path is joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Account username.
    #[serde(default)]
    pub username: Option<String>,
    /// Account API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Project that new and cloned resources are assigned to.
    #[serde(default)]
    pub project: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Allow cleartext HTTP base URLs (local stubs only).
    #[serde(default)]
    pub allow_http: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            api_key: None,
            project: None,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            allow_http: false,
        }
    }
}

impl ApiConfig {
    /// Returns the configured credentials when both parts are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.api_key) {
            (Some(username), Some(api_key)) => Some((username.as_str(), api_key.as_str())),
            _ => None,
        }
    }

    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validates API settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.starts_with("http://") {
            if !self.allow_http {
                return Err(ConfigError::Invalid(
                    "api.base_url uses http:// without allow_http".to_string(),
                ));
            }
        } else if !base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "api.base_url must include http:// or https://".to_string(),
            ));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "api.timeout_ms must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.username.is_some() != self.api_key.is_some() {
            return Err(ConfigError::Invalid(
                "api.username and api.api_key must be set together".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("api.user_agent must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Status polling settings.
///
/// # Invariants
/// - `0 < initial_delay_ms <= max_delay_ms`.
/// - `1 <= timeout_scale <= 100`.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Delay before the second status read.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for the doubling delay between reads.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to every step timeout (slow environments).
    #[serde(default = "default_timeout_scale")]
    pub timeout_scale: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            timeout_scale: default_timeout_scale(),
        }
    }
}

impl PollingConfig {
    /// Validates polling settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "polling.initial_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::Invalid(
                "polling.max_delay_ms must be >= polling.initial_delay_ms".to_string(),
            ));
        }
        if !(1..=MAX_TIMEOUT_SCALE).contains(&self.timeout_scale) {
            return Err(ConfigError::Invalid(format!(
                "polling.timeout_scale must be between 1 and {MAX_TIMEOUT_SCALE}"
            )));
        }
        Ok(())
    }
}

/// Local resource file settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    /// Directory relative step file arguments resolve against.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Optional JSON-lines audit log path.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            audit_log: None,
        }
    }
}

impl ResourcesConfig {
    /// Resolves a step file argument against `data_dir`.
    ///
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() { relative.to_path_buf() } else { self.data_dir.join(relative) }
    }

    /// Validates resource settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("resources.data_dir", &self.data_dir.to_string_lossy())?;
        if let Some(audit_log) = &self.audit_log {
            validate_path_string("resources.audit_log", &audit_log.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default API base URL.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default user agent.
fn default_user_agent() -> String {
    "ensemble-harness/0.1".to_string()
}

/// Default first polling delay.
const fn default_initial_delay_ms() -> u64 {
    DEFAULT_INITIAL_DELAY_MS
}

/// Default polling delay cap.
const fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

/// Default timeout multiplier.
const fn default_timeout_scale() -> u32 {
    1
}

/// Default resource directory.
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} component too long")));
        }
    }
    Ok(())
}
