//! Configuration system for the consultation mesh
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (CONSULT_MESH_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values, with the bundled demo fleet when no workers are configured

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::generation::{BackendKind, OpenAiConfig};
use crate::mesh::DEFAULT_ORCHESTRATOR_ID;
use crate::persona::{bundled_fleet, WorkerSpec};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CONSULT_MESH_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chain policy
    pub mesh: MeshSettings,

    /// Generation capability
    pub generation: GenerationSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Worker roster
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workers: Vec<WorkerSpec>,
}

/// Chain policy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    /// End-to-end bound for one submitted chain in milliseconds (0 = unbounded)
    pub chain_timeout_ms: u64,

    /// Maximum nested consultations per chain (unset = unbounded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chain_depth: Option<u32>,

    /// Sender identity for external submissions
    pub orchestrator_id: String,

    /// Seed for reproducible peer selection and consultation rolls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Tokio worker threads (0 = one per core)
    pub worker_threads: usize,
}

/// Generation capability settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// "openai" for any OpenAI-compatible server, "mock" for offline runs
    pub backend: String,

    /// API base URL
    pub base_url: String,

    /// API key (empty for local servers)
    pub api_key: String,

    /// Model used when a worker does not name one
    pub default_model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries on transient errors, inside the backend only
    pub max_retries: u32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (unset = console only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// ─────────────────────────────────────────────────────────────────
// Default implementations
// ─────────────────────────────────────────────────────────────────

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            chain_timeout_ms: 300_000,
            max_chain_depth: None,
            orchestrator_id: DEFAULT_ORCHESTRATOR_ID.to_string(),
            seed: None,
            worker_threads: 0,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        let openai = OpenAiConfig::default();
        Self {
            backend: "openai".to_string(),
            base_url: openai.base_url,
            api_key: openai.api_key,
            default_model: openai.default_model,
            timeout_secs: openai.timeout_secs,
            max_retries: openai.max_retries,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl MeshSettings {
    /// The chain timeout as a Duration (None = unbounded)
    pub fn chain_timeout(&self) -> Option<Duration> {
        (self.chain_timeout_ms > 0).then(|| Duration::from_millis(self.chain_timeout_ms))
    }
}

impl GenerationSettings {
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            default_model: self.default_model.clone(),
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path)?;
            config = toml::from_str(&content)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Fall back to the bundled fleet
        if config.workers.is_empty() {
            debug!("No workers configured, using bundled fleet");
            config.workers = bundled_fleet()?;
        }

        // 3. Apply environment variable overrides
        config.apply_env_overrides();

        // 4. Expand paths
        config.expand_paths();

        // 5. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML string, filling in the bundled fleet and validating
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        if config.workers.is_empty() {
            config.workers = bundled_fleet()?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let search_paths = [
            PathBuf::from("consult-mesh.toml"),
            dirs::config_dir()
                .map(|p| p.join("consult-mesh").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".consult-mesh").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Logging
        if let Some(val) = env_var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = env_var("LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = env_var("LOG_JSON") {
            self.logging.json_format = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        // Mesh
        if let Some(n) = env_var("CHAIN_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.mesh.chain_timeout_ms = n;
        }
        if let Some(n) = env_var("MAX_CHAIN_DEPTH").and_then(|v| v.parse().ok()) {
            self.mesh.max_chain_depth = Some(n);
        }
        if let Some(n) = env_var("SEED").and_then(|v| v.parse().ok()) {
            self.mesh.seed = Some(n);
        }

        // Generation
        if let Some(val) = env_var("BACKEND") {
            self.generation.backend = val;
        }
        if let Some(val) = env_var("OPENAI_BASE_URL") {
            self.generation.base_url = val;
        }
        if let Some(val) = env_var("OPENAI_API_KEY") {
            self.generation.api_key = val;
        }
        if let Some(val) = env_var("OPENAI_MODEL") {
            self.generation.default_model = val;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }

        let backend = BackendKind::parse(&self.generation.backend).ok_or_else(|| {
            let known: Vec<&str> = BackendKind::all().iter().map(|k| k.name()).collect();
            Error::config_field_invalid(
                "generation.backend",
                format!(
                    "Unknown backend '{}'. Must be one of: {}",
                    self.generation.backend,
                    known.join(", ")
                ),
            )
        })?;
        if backend == BackendKind::OpenAi
            && !self.generation.base_url.starts_with("http://")
            && !self.generation.base_url.starts_with("https://")
        {
            return Err(Error::config_field_invalid(
                "generation.base_url",
                "Base URL must start with http:// or https://",
            ));
        }

        if self.mesh.max_chain_depth == Some(0) {
            return Err(Error::config_field_invalid(
                "mesh.max_chain_depth",
                "max_chain_depth must be at least 1 when set",
            ));
        }
        if self.mesh.orchestrator_id.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "mesh.orchestrator_id",
                "orchestrator_id cannot be empty",
            ));
        }

        let mut seen = HashSet::new();
        for spec in &self.workers {
            if spec.id.trim().is_empty() {
                return Err(Error::config_field_invalid("workers.id", "Worker id cannot be empty"));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(Error::config_field_invalid(
                    format!("workers.{}", spec.id),
                    format!("Duplicate worker id '{}'", spec.id),
                ));
            }
            if spec.id == self.mesh.orchestrator_id {
                return Err(Error::config_field_invalid(
                    format!("workers.{}", spec.id),
                    "Worker id collides with mesh.orchestrator_id",
                ));
            }
            spec.worker_config()?;
        }

        Ok(())
    }

    /// Find a worker entry by id
    pub fn worker(&self, id: &str) -> Option<&WorkerSpec> {
        self.workers.iter().find(|w| w.id == id)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".consult-mesh")
        .join("config.toml")
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&config_path, generate_default_config())?;
    Ok(config_path)
}

/// Generate default configuration content with comments
pub fn generate_default_config() -> String {
    r#"# Consultation mesh configuration

[mesh]
# End-to-end bound for one submitted chain, in milliseconds (0 = unbounded).
# Chains have no cycle detection, so this is what stops A -> B -> A loops.
chain_timeout_ms = 300000

# Maximum nested consultations per chain (unset = unbounded)
# max_chain_depth = 8

# Sender identity for external submissions
orchestrator_id = "orchestrator"

# Seed for reproducible runs
# seed = 42

# Tokio worker threads (0 = one per core)
worker_threads = 0

[generation]
# "openai" for any OpenAI-compatible server (OpenAI, Ollama, vLLM), "mock" for offline runs
backend = "openai"

base_url = "https://api.openai.com/v1"

# API key (leave empty for local servers like Ollama)
api_key = ""

# Model used when a worker does not name one
default_model = "gpt-4o-mini"

# Request timeout in seconds
timeout_secs = 120

# Retries on 429/5xx/connection errors
max_retries = 2

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (daily rotation)
# file = "~/.consult-mesh/logs/consult-mesh.log"

# Number of rotated log files to keep
max_files = 5

# JSON formatted logs
json_format = false

# Workers. Without any [[workers]] entries the bundled demo fleet is used.
#
# [[workers]]
# id = "chef"
# persona = "You are a chef who turns any idea into a memorable dining concept."
# consultation_probability = 0.3
# framing = "Here is my idea. It may not be your speciality, but please refine it and make it better. {draft}"
# model = "gpt-4o-mini"
# temperature = 0.8
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.mesh.chain_timeout_ms, 300_000);
        assert_eq!(config.mesh.max_chain_depth, None);
        assert_eq!(config.mesh.orchestrator_id, "orchestrator");
        assert_eq!(config.generation.backend, "openai");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_chain_timeout_zero_is_unbounded() {
        let mut mesh = MeshSettings::default();
        assert_eq!(mesh.chain_timeout(), Some(Duration::from_secs(300)));
        mesh.chain_timeout_ms = 0;
        assert_eq!(mesh.chain_timeout(), None);
    }

    #[test]
    fn test_env_override() {
        env::set_var("CONSULT_MESH_CHAIN_TIMEOUT_MS", "1500");
        env::set_var("CONSULT_MESH_MAX_CHAIN_DEPTH", "4");
        env::set_var("CONSULT_MESH_BACKEND", "mock");
        env::set_var("CONSULT_MESH_LOG_JSON", "true");

        let mut config = AppConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.mesh.chain_timeout_ms, 1500);
        assert_eq!(config.mesh.max_chain_depth, Some(4));
        assert_eq!(config.generation.backend, "mock");
        assert!(config.logging.json_format);

        env::remove_var("CONSULT_MESH_CHAIN_TIMEOUT_MS");
        env::remove_var("CONSULT_MESH_MAX_CHAIN_DEPTH");
        env::remove_var("CONSULT_MESH_BACKEND");
        env::remove_var("CONSULT_MESH_LOG_JSON");
    }

    #[test]
    fn test_validation_valid_config() {
        let mut config = AppConfig::default();
        config.workers = bundled_fleet().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_backend() {
        let mut config = AppConfig::default();
        config.generation.backend = "carrier-pigeon".to_string();
        match config.validate().unwrap_err() {
            Error::ConfigValidation { field, .. } => {
                assert_eq!(field.as_deref(), Some("generation.backend"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut config = AppConfig::default();
        config.generation.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());

        config.generation.backend = "mock".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_depth() {
        let mut config = AppConfig::default();
        config.mesh.max_chain_depth = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_expansion() {
        let mut config = AppConfig::default();
        config.logging.file = Some("~/logs/mesh.log".to_string());
        config.expand_paths();
        assert!(!config.logging.file.unwrap().contains('~'));
    }

    #[test]
    fn test_serialize_deserialize() {
        let mut config = AppConfig::default();
        config.workers = bundled_fleet().unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.mesh.chain_timeout_ms, parsed.mesh.chain_timeout_ms);
        assert_eq!(config.workers.len(), parsed.workers.len());
    }

    #[test]
    fn test_generated_default_config_parses() {
        let config = AppConfig::from_toml(&generate_default_config()).unwrap();
        assert_eq!(config.generation.default_model, "gpt-4o-mini");
        assert!(!config.workers.is_empty());
    }

    #[test]
    fn test_parse_config_file() {
        let config_str = r#"
[mesh]
chain_timeout_ms = 0
max_chain_depth = 3
seed = 7

[generation]
backend = "mock"

[[workers]]
id = "a"
persona = "Alpha"
consultation_probability = 1.0

[[workers]]
id = "b"
persona = "Beta"
consultation_probability = 0.0
"#;

        let config = AppConfig::from_toml(config_str).unwrap();
        assert_eq!(config.mesh.chain_timeout(), None);
        assert_eq!(config.mesh.max_chain_depth, Some(3));
        assert_eq!(config.mesh.seed, Some(7));
        assert_eq!(config.workers.len(), 2);
        assert_eq!(config.worker("b").unwrap().consultation_probability, 0.0);
    }
}
