//! Configuration management for Syllabus.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`.syllabus/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all state stored in `.syllabus/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the generation layer knows how to talk to.
pub const KNOWN_PROVIDERS: [&str; 2] = ["claude", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .syllabus/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("claude" or "ollama")
    pub provider: String,

    /// Generation model identifier
    pub model: String,

    /// API key for the generation provider
    pub api_key: Option<String>,

    /// Custom provider endpoint
    pub endpoint: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Sampling settings for generation calls
    pub generation: GenerationSettings,

    /// Retrieval and memory settings
    pub retrieval: RetrievalSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Location of the SQLite vector index
    pub index_path: Option<PathBuf>,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,
}

/// Sampling settings sent with every generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationSettings {
    #[serde(rename = "maxTokens", default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    800
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

/// Retrieval and conversation-memory settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalSettings {
    /// Number of content chunks returned per search
    #[serde(rename = "maxResults", default = "default_max_results")]
    pub max_results: usize,

    /// Number of exchanges kept per session
    #[serde(rename = "maxHistory", default = "default_max_history")]
    pub max_history: usize,

    /// Minimum cosine similarity for course resolution; `None` always accepts the nearest course
    #[serde(rename = "minCourseSimilarity", default)]
    pub min_course_similarity: Option<f32>,
}

fn default_max_results() -> usize {
    5
}

fn default_max_history() -> usize {
    2
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_history: default_max_history(),
            min_course_similarity: None,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingSettings {
    /// "trigram" (offline) or "ollama"
    pub provider: String,

    pub model: String,

    pub dimensions: usize,

    /// Endpoint for network providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Model configured for this provider.
    pub fn model(&self) -> &str {
        match self {
            Self::Claude { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    /// Endpoint configured for this provider, if any.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Claude { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    generation: Option<GenerationSettings>,
    retrieval: Option<RetrievalSettings>,
    embedding: Option<EmbeddingSettings>,
    index: Option<IndexConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexConfig {
    path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "claude".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            endpoint: None,
            log_level: None,
            verbose: false,
            no_color: false,
            generation: GenerationSettings::default(),
            retrieval: RetrievalSettings::default(),
            embedding: EmbeddingSettings::default(),
            index_path: None,
            llm: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `SYLLABUS_WORKSPACE`: Override workspace path
    /// - `SYLLABUS_CONFIG`: Path to config file
    /// - `SYLLABUS_PROVIDER`: Generation provider
    /// - `SYLLABUS_MODEL`: Model identifier
    /// - `SYLLABUS_API_KEY`: API key
    /// - `SYLLABUS_MAX_RESULTS`: Chunks returned per search
    /// - `SYLLABUS_MAX_HISTORY`: Exchanges remembered per session
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("SYLLABUS_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SYLLABUS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.syllabus_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("SYLLABUS_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SYLLABUS_MODEL") {
            config.model = model;
        }

        if let Ok(max_results) = std::env::var("SYLLABUS_MAX_RESULTS") {
            config.retrieval.max_results = parse_env_usize("SYLLABUS_MAX_RESULTS", &max_results)?;
        }

        if let Ok(max_history) = std::env::var("SYLLABUS_MAX_HISTORY") {
            config.retrieval.max_history = parse_env_usize("SYLLABUS_MAX_HISTORY", &max_history)?;
        }

        config.api_key = std::env::var("SYLLABUS_API_KEY").ok();

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(generation) = config_file.generation {
            result.generation = generation;
        }

        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(path) = config_file.index.and_then(|index| index.path) {
            result.index_path = Some(PathBuf::from(path));
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model().to_string();
                result.endpoint = provider_config.endpoint().map(str::to_string);
            }

            result.llm = Some(llm);
        }

        tracing::debug!("Merged configuration from {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .syllabus directory.
    pub fn syllabus_dir(&self) -> PathBuf {
        self.workspace.join(".syllabus")
    }

    /// Ensure the .syllabus directory exists.
    pub fn ensure_syllabus_dir(&self) -> AppResult<()> {
        let dir = self.syllabus_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .syllabus directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved location of the SQLite vector index.
    pub fn resolved_index_path(&self) -> PathBuf {
        match &self.index_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.workspace.join(path),
            None => self.syllabus_dir().join("index.sqlite"),
        }
    }

    /// Get the configuration block for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider))
    }

    /// Resolve the API key: explicit key first, then the provider's configured env var.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = match self.get_provider_config(provider) {
            Some(ProviderConfig::Claude { api_key_env, .. }) => api_key_env.clone(),
            Some(ProviderConfig::Ollama { .. }) => return None,
            None if provider == "claude" || provider == "anthropic" => {
                "ANTHROPIC_API_KEY".to_string()
            }
            None => return None,
        };

        std::env::var(&env_var).ok()
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) && provider != "anthropic" {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if (provider == "claude" || provider == "anthropic")
            && self.resolve_api_key(provider).is_none()
        {
            return Err(AppError::Config(
                "Claude provider requires an API key (set SYLLABUS_API_KEY or ANTHROPIC_API_KEY)"
                    .to_string(),
            ));
        }

        if self.retrieval.max_results == 0 {
            return Err(AppError::Config(
                "retrieval.maxResults must be at least 1".to_string(),
            ));
        }

        if let Some(floor) = self.retrieval.min_course_similarity {
            if !(-1.0..=1.0).contains(&floor) {
                return Err(AppError::Config(format!(
                    "retrieval.minCourseSimilarity must be within [-1, 1], got {}",
                    floor
                )));
            }
        }

        Ok(())
    }
}

fn parse_env_usize(name: &str, value: &str) -> AppResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid value for {}: {} ({})", name, value, e)))
}
