use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::stages::{StageOverride, StageRegistry};

/// Main configuration structure for the pipeline board
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineBoardConfig {
    /// Hosted data service settings
    pub remote: RemoteConfig,
    /// Board behavior and stage display overrides
    pub board: BoardConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Service root, e.g. `https://xyz.example.co`
    pub base_url: String,
    /// API key (can be set via env var)
    pub api_key: Option<String>,
    /// Table holding the client roster
    pub table: String,
    pub request_timeout_seconds: u64,
    /// Attempts per roster fetch, including the first
    pub fetch_max_attempts: u32,
    /// Base delay between fetch attempts, multiplied by the attempt number
    pub retry_delay_ms: u64,
    pub cache_ttl_seconds: u64,
    pub rate_limit: RateLimitConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None, // Read from env var or pipeline-board.toml
            table: "clients".to_string(),
            request_timeout_seconds: 15,
            fetch_max_attempts: 3,
            retry_delay_ms: 250,
            cache_ttl_seconds: 30,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_capacity: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardConfig {
    /// How many settled move statuses stay queryable
    pub settled_history_limit: usize,
    /// Buffer size of the failure notification channel
    pub notification_capacity: usize,
    /// Label/color overrides keyed by stage key
    pub stages: HashMap<String, StageOverride>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            settled_history_limit: 256,
            notification_capacity: 64,
            stages: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl PipelineBoardConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `pipeline-board.toml` in the working directory
    /// 3. The explicit file, if given
    /// 4. Environment variables (`PIPELINE_BOARD_REMOTE__BASE_URL`, ...)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("pipeline-board.toml").exists() {
            builder = builder.add_source(File::with_name("pipeline-board"));
        }

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PIPELINE_BOARD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to read configuration")?;
        let mut board_config: PipelineBoardConfig = config.try_deserialize()?;

        if board_config.remote.api_key.is_none() {
            if let Ok(key) = std::env::var("PIPELINE_BOARD_API_KEY") {
                board_config.remote.api_key = Some(key);
            }
        }

        Ok(board_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::debug!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Stage registry with the configured display overrides applied
    pub fn registry(&self) -> Result<StageRegistry> {
        StageRegistry::with_overrides(&self.board.stages).context("Invalid stage override in [board.stages]")
    }
}
