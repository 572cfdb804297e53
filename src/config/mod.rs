//! Application configuration
//!
//! Settings come from three layers, later layers winning:
//! built-in defaults, an optional TOML file named by `RELAY_CONFIG`, and
//! process environment variables.

pub mod file;

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use file::{ConfigError, ConfigFile};

pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Upstream backend: "openai" or "ollama"
    pub provider: String,
    /// Fixed model identifier sent with every completion request
    pub model: String,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub ollama_url: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            provider: "openai".into(),
            model: DEFAULT_MODEL.into(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            timeout_secs: 120,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match env::var("RELAY_CONFIG") {
            Ok(path) => Some(ConfigFile::from_file(Path::new(&path))?),
            Err(_) => None,
        };
        Self::resolve(file.as_ref(), |key| env::var(key).ok())
    }

    /// Layer `file` and then `lookup` over the defaults.
    pub fn resolve<F>(file: Option<&ConfigFile>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let mut api_key_env = DEFAULT_API_KEY_ENV.to_string();
        let file_base_url = file.and_then(|f| f.upstream.base_url.clone());

        if let Some(file) = file {
            if let Some(host) = &file.server.host {
                config.host = host.clone();
            }
            if let Some(port) = file.server.port {
                config.port = port;
            }
            if let Some(provider) = &file.upstream.provider {
                config.provider = provider.to_lowercase();
            }
            if let Some(model) = &file.upstream.model {
                config.model = model.clone();
            }
            if let Some(name) = &file.upstream.api_key_env {
                api_key_env = name.clone();
            }
            if let Some(timeout) = file.upstream.timeout_secs {
                config.timeout_secs = timeout;
            }
        }

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid PORT: {port}")))?;
        }
        if let Some(provider) = lookup("RELAY_PROVIDER") {
            config.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("RELAY_MODEL") {
            config.model = model;
        }
        // The file's base_url belongs to whichever provider ends up selected
        if let Some(base_url) = file_base_url {
            match config.provider.as_str() {
                "ollama" => config.ollama_url = base_url,
                _ => config.openai_base_url = base_url,
            }
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai_base_url = url;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            config.ollama_url = url;
        }
        if let Some(timeout) = lookup("RELAY_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                ConfigError::Validation(format!("invalid RELAY_TIMEOUT_SECS: {timeout}"))
            })?;
        }
        config.openai_api_key = lookup(api_key_env.as_str()).filter(|k| !k.is_empty());

        config.openai_base_url = config.openai_base_url.trim_end_matches('/').to_string();
        config.ollama_url = config.ollama_url.trim_end_matches('/').to_string();

        if config.model.trim().is_empty() {
            return Err(ConfigError::Validation("model must not be empty".into()));
        }

        Ok(config)
    }
}
