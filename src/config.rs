//! Configuration Loading (Figment-based)
//!
//! Loads and merges configuration from multiple sources:
//! 1. Built-in defaults (Serialized)
//! 2. Project config (.autodoc/config.toml)
//! 3. Environment variables (AUTODOC_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{budget, discovery, retry, synthesis};
use crate::error::{DocError, Result};

/// Top-level configuration for a documentation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Per-unit token budget for chunking and prompt sizing
    pub unit_budget: usize,
    /// Recognized file extensions (without dot)
    pub extensions: Vec<String>,
    /// Directory names excluded from discovery
    pub exclude_dirs: Vec<String>,
    /// Maximum file size to catalog, in bytes
    pub max_file_size: u64,
    /// LLM provider settings
    pub provider: ProviderSettings,
    /// Retry policy for generation calls
    pub retry: RetrySettings,
    /// Number of units synthesized concurrently (1 = strict order)
    pub max_concurrent_units: usize,
    /// Markdown output path, relative to the root
    pub doc_output: PathBuf,
    /// SKF output path, relative to the root. Defaults to the Markdown
    /// path with the `.skf.txt` suffix.
    pub skf_output: Option<PathBuf>,
}

/// LLM provider settings
///
/// The API key is read from the environment, never from config files,
/// and is not serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider type: "openai" (OpenAI-compatible endpoint)
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// API base URL for custom endpoints
    pub api_base: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate per call
    pub max_tokens: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_base: None,
            temperature: 0.1,
            max_tokens: 4_000,
            timeout_secs: retry::LLM_TIMEOUT_SECS,
        }
    }
}

/// Retry policy for retryable generation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts per unit (initial call + retries)
    pub max_attempts: usize,
    /// Base delay for exponential backoff (milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (seconds)
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: retry::MAX_ATTEMPTS,
            base_delay_ms: retry::BASE_DELAY_MS,
            max_delay_secs: retry::MAX_DELAY_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unit_budget: budget::DEFAULT_UNIT_BUDGET,
            extensions: discovery::DEFAULT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude_dirs: discovery::DEFAULT_SKIP_DIRS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_file_size: discovery::MAX_FILE_SIZE,
            provider: ProviderSettings::default(),
            retry: RetrySettings::default(),
            max_concurrent_units: synthesis::DEFAULT_CONCURRENCY,
            doc_output: PathBuf::from(crate::constants::output::DEFAULT_DOC_FILE),
            skf_output: None,
        }
    }
}

impl Config {
    /// Load configuration with the full resolution chain:
    /// defaults → project config → env vars
    pub fn load(root: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let project_path = root.join(".autodoc").join("config.toml");
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // Double underscore nests (AUTODOC_PROVIDER__MODEL -> provider.model)
        // so flat keys like unit_budget keep their underscores
        figment = figment.merge(Env::prefixed("AUTODOC_").split("__").lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| DocError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (plus defaults)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| DocError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges after loading
    pub fn validate(&self) -> Result<()> {
        if self.unit_budget == 0 {
            return Err(DocError::Config("unit_budget must be positive".to_string()));
        }
        if self.extensions.is_empty() {
            return Err(DocError::Config(
                "at least one extension must be configured".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(DocError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_units == 0 || self.max_concurrent_units > synthesis::MAX_CONCURRENCY
        {
            return Err(DocError::Config(format!(
                "max_concurrent_units must be in 1..={}",
                synthesis::MAX_CONCURRENCY
            )));
        }
        Ok(())
    }

    /// Resolved SKF output path
    pub fn skf_output_path(&self) -> PathBuf {
        self.skf_output.clone().unwrap_or_else(|| {
            let mut name = self.doc_output.as_os_str().to_os_string();
            name.push(crate::constants::skf::DEFAULT_SUFFIX);
            PathBuf::from(name)
        })
    }
}
