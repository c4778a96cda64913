// SPDX-License-Identifier: MIT

//! Application configuration - YAML file plus environment overrides
//!
//! Every field has a default, so running without a config file gives a
//! rule-engine-only server on `0.0.0.0:5000`. Environment variables win over
//! the file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::{FlowForgeError, Result};
use crate::forge::catalog::catalog;
use crate::forge::classifier::{IntentClassifier, DEFAULT_FILLER};
use crate::forge::graph::Topology;
use crate::model::openai::DEFAULT_BASE_URL;
use crate::model::GenerationConfig;

/// Config file read when no path is given, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "flowforge.yaml";

/// Default address of a self-hosted inference service
pub const DEFAULT_LOCAL_URL: &str = "http://127.0.0.1:8000";

/// Environment variable holding the chat completions API key by default
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub synthesis: SynthesisConfig,
    /// External generator; absent means rule engine only
    pub model: Option<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// What the classifier adds when a prompt names nothing actionable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// One HTTP Request node
    #[default]
    Single,
    /// The configured multi-app template
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub topology: Topology,
    pub fallback: FallbackPolicy,
    /// Action keys used by the `template` fallback
    pub template: Vec<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            topology: Topology::Linear,
            fallback: FallbackPolicy::Single,
            template: vec!["http".to_string(), "set".to_string(), "gmail".to_string()],
        }
    }
}

impl SynthesisConfig {
    pub fn filler_keys(&self) -> Vec<String> {
        match self.fallback {
            FallbackPolicy::Single => vec![DEFAULT_FILLER.to_string()],
            FallbackPolicy::Template => self.template.clone(),
        }
    }

    pub fn classifier(&self) -> IntentClassifier {
        IntentClassifier::new(self.filler_keys())
    }
}

/// Kind of external generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// OpenAI-compatible chat completions (Groq, OpenAI, ...)
    #[default]
    OpenAI,
    /// Self-hosted `POST /generate` inference service
    Local,
}

impl fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelProvider::OpenAI => write!(f, "openai"),
            ModelProvider::Local => write!(f, "local"),
        }
    }
}

impl FromStr for ModelProvider {
    type Err = FlowForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "groq" => Ok(ModelProvider::OpenAI),
            "local" => Ok(ModelProvider::Local),
            other => Err(FlowForgeError::config(format!(
                "Unknown model provider '{}', expected 'openai' or 'local'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub model_name: String,
    /// Defaults to Groq for `openai` and localhost for `local`
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAI,
            model_name: "llama-3.3-70b-versatile".to_string(),
            base_url: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 20,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url,
            (None, ModelProvider::OpenAI) => DEFAULT_BASE_URL,
            (None, ModelProvider::Local) => DEFAULT_LOCAL_URL,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(self.temperature),
            max_output_tokens: Some(self.max_tokens),
            top_p: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_PATH`] if it
    /// exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file without environment overrides
    pub fn load_file(path: &Path) -> Result<Self> {
        log::info!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Any of `MODEL_PROVIDER`, `MODEL_NAME`, `MODEL_BASE_URL` or an API key
    /// in the default key variable enables the model section.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = lookup("FLOWFORGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("FLOWFORGE_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| FlowForgeError::config(format!("Invalid FLOWFORGE_PORT '{}'", port)))?;
        }

        let provider = lookup("MODEL_PROVIDER");
        let model_name = lookup("MODEL_NAME");
        let base_url = lookup("MODEL_BASE_URL");
        let enable = provider.is_some()
            || model_name.is_some()
            || base_url.is_some()
            || lookup(DEFAULT_API_KEY_ENV).is_some();
        if !enable {
            return Ok(());
        }

        let model = self.model.get_or_insert_with(ModelConfig::default);
        if let Some(provider) = provider {
            model.provider = provider.parse()?;
        }
        if let Some(name) = model_name {
            model.model_name = name;
        }
        if let Some(url) = base_url {
            model.base_url = Some(url);
        }
        Ok(())
    }

    /// Check values serde can't: catalog keys, URLs and limits
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.fallback == FallbackPolicy::Template && self.synthesis.template.is_empty() {
            return Err(FlowForgeError::config(
                "synthesis.template must list at least one key when fallback is 'template'",
            ));
        }
        for key in self.synthesis.filler_keys() {
            let desc = catalog().get(&key).map_err(|_| {
                FlowForgeError::config(format!("synthesis.template key '{}' is not in the catalog", key))
            })?;
            if desc.is_trigger() {
                return Err(FlowForgeError::config(format!(
                    "synthesis.template key '{}' is a trigger",
                    key
                )));
            }
        }

        if let Some(model) = &self.model {
            Url::parse(model.base_url()).map_err(|e| {
                FlowForgeError::config(format!("Invalid model base URL '{}': {}", model.base_url(), e))
            })?;
            if model.timeout_secs == 0 {
                return Err(FlowForgeError::config("model.timeout_secs must be greater than 0"));
            }
            if model.api_key_env.trim().is_empty() {
                return Err(FlowForgeError::config("model.api_key_env must not be empty"));
            }
        }
        Ok(())
    }
}
