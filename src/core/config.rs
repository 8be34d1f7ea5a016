//! Generator settings: optional YAML file, environment and CLI flags

use crate::core::ConfigError;
use crate::provider::{ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INSTRUCTIONS_DIR: &str = "config";
pub const DEFAULT_CMAKE: &str = "cmake";

/// Generic key checked before the provider-specific variable
pub const API_KEY_ENV: &str = "TESTGEN_API_KEY";

/// Settings as written in a settings file or given on the command line
///
/// Every field is optional so that layers can be merged; defaults are only
/// applied when resolving into a [`GeneratorConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub instructions_dir: Option<PathBuf>,
    #[serde(default)]
    pub cmake: Option<String>,
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|e| e.with_path(path))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to unit, not to a mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml { path: None, source })
    }

    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            project_path: other.project_path.or(self.project_path),
            output_dir: other.output_dir.or(self.output_dir),
            provider: other.provider.or(self.provider),
            model: other.model.or(self.model),
            api_key: other.api_key.or(self.api_key),
            api_url: other.api_url.or(self.api_url),
            temperature: other.temperature.or(self.temperature),
            max_tokens: other.max_tokens.or(self.max_tokens),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
            instructions_dir: other.instructions_dir.or(self.instructions_dir),
            cmake: other.cmake.or(self.cmake),
        }
    }
}

/// Fully resolved configuration for one generator run
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Root of the C++ project to generate tests for
    pub project_path: PathBuf,

    /// Where test files, CMakeLists.txt and the report are written
    pub output_dir: PathBuf,

    pub provider: ProviderConfig,

    /// Directory holding the per-stage instruction YAML files
    pub instructions_dir: PathBuf,

    /// cmake executable used by the build stage
    pub cmake_program: String,
}

impl GeneratorConfig {
    /// Resolve settings layers into a config
    ///
    /// Precedence is CLI > environment (API key only) > settings file >
    /// built-in default. `env` is injected so tests do not touch the
    /// process environment.
    pub fn resolve(
        file: Settings,
        cli: Settings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let cli_api_key = cli.api_key.clone();
        let file_api_key = file.api_key.clone();
        let merged = file.merge(cli);

        let project_path = merged
            .project_path
            .ok_or_else(|| ConfigError::Invalid("project path is required".to_string()))?;
        let output_dir = merged
            .output_dir
            .ok_or_else(|| ConfigError::Invalid("output directory is required".to_string()))?;

        let kind = merged.provider.unwrap_or(ProviderKind::Ollama);
        let api_key = cli_api_key
            .or_else(|| env(API_KEY_ENV))
            .or_else(|| kind.key_env_var().and_then(&env))
            .or(file_api_key)
            .filter(|k| !k.trim().is_empty());

        let mut provider = ProviderConfig::new(kind);
        if let Some(model) = merged.model {
            provider = provider.with_model(model);
        }
        if let Some(api_key) = api_key {
            provider = provider.with_api_key(api_key);
        }
        if let Some(api_url) = merged.api_url {
            provider = provider.with_api_url(api_url);
        }
        if let Some(temperature) = merged.temperature {
            provider = provider.with_temperature(temperature);
        }
        if let Some(max_tokens) = merged.max_tokens {
            provider = provider.with_max_tokens(max_tokens);
        }
        if let Some(timeout_secs) = merged.timeout_secs {
            provider = provider.with_timeout(timeout_secs);
        }

        Ok(Self {
            project_path,
            output_dir,
            provider,
            instructions_dir: merged
                .instructions_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTRUCTIONS_DIR)),
            cmake_program: merged.cmake.unwrap_or_else(|| DEFAULT_CMAKE.to_string()),
        })
    }

    /// Validate values that would otherwise fail late in the run
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.project_path.is_dir() {
            return Err(ConfigError::Invalid(format!(
                "project path is not a directory: {}",
                self.project_path.display()
            )));
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.provider.temperature
            )));
        }
        if self.provider.max_tokens == 0 {
            return Err(ConfigError::Invalid("max tokens must be greater than 0".to_string()));
        }
        if self.provider.kind.requires_api_key() && self.provider.api_key.is_none() {
            let hint = self
                .provider
                .kind
                .key_env_var()
                .map(|var| format!(" (use --api-key, {} or {})", API_KEY_ENV, var))
                .unwrap_or_default();
            return Err(ConfigError::Invalid(format!(
                "{} requires an API key{}",
                self.provider.kind, hint
            )));
        }
        Ok(())
    }
}
