use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Fallback base URL for a locally running memory service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v2";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Deserialize, Clone)]
pub struct ParleyConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the memory service.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Health endpoint. When unset, `/healthz` on the base URL's origin is used.
    #[serde(default)]
    pub health_url: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            health_url: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, "")
    }
}

impl ParleyConfig {
    /// Load `path` (optional, TOML) layered under `PARLEY__`-prefixed environment
    /// variables, e.g. `PARLEY__SERVICE__API_KEY`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("service.base_url", DEFAULT_BASE_URL)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("PARLEY").separator("__"))
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("service.base_url", DEFAULT_BASE_URL)?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}
