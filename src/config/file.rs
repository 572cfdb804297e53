//! Optional TOML configuration file
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 3000
//!
//! [upstream]
//! provider = "openai"
//! model = "gpt-4.1-nano"
//! base_url = "https://api.openai.com/v1"  # or Groq, vLLM, etc.
//! api_key_env = "OPENAI_API_KEY"
//! timeout_secs = 120
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of the TOML file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub upstream: UpstreamSection,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile = toml::from_str(content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// Upstream completion service settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSection {
    /// Provider name: "openai" or "ollama"
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Base URL of the provider API
    #[serde(default)]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = ConfigFile::from_str(
            r#"
[server]
host = "0.0.0.0"
port = 8080

[upstream]
provider = "ollama"
model = "llama3.2"
base_url = "http://gpu-box:11434"
timeout_secs = 300
"#,
        )
        .unwrap();

        assert_eq!(config.server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.upstream.provider.as_deref(), Some("ollama"));
        assert_eq!(config.upstream.timeout_secs, Some(300));
        assert!(config.upstream.api_key_env.is_none());
    }

    #[test]
    fn test_empty_file() {
        let config = ConfigFile::from_str("").unwrap();
        assert!(config.server.port.is_none());
        assert!(config.upstream.model.is_none());
    }

    #[test]
    fn test_bad_toml() {
        let result = ConfigFile::from_str("[server\nport = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigFile::from_file(Path::new("/nonexistent/relay.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
