//! Configuration system for WaveSight
//!
//! Supports loading configuration from:
//! 1. CLI --config argument
//! 2. ~/.config/wavesight/config.{WAVESIGHT_ENV}.json
//! 3. Default values
//!
//! Where WAVESIGHT_ENV can be: production (default), development, test
//!
//! # Examples
//!
//! ```no_run
//! use wavesight::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! println!("Threshold: {} via {}", config.similarity_threshold, config.embedder);
//! # Ok(())
//! # }
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - WAVESIGHT_DB_PATH
//! - WAVESIGHT_SIMILARITY_THRESHOLD
//! - WAVESIGHT_EMBEDDER

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Supported embedding providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    #[default]
    FastEmbed,
    Hashing,
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FastEmbed => write!(f, "fastembed"),
            Self::Hashing => write!(f, "hashing"),
        }
    }
}

impl std::str::FromStr for EmbedderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fastembed" => Ok(Self::FastEmbed),
            "hashing" => Ok(Self::Hashing),
            _ => Err(ConfigError::ValidationError(format!(
                "Unknown embedder: {}",
                s
            ))),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Minimum mean similarity required to join an existing cluster
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Embedding provider
    #[serde(default)]
    pub embedder: EmbedderKind,

    /// Vector dimension for the hashing embedder
    #[serde(default = "default_hashing_dimension")]
    pub hashing_dimension: usize,

    /// Number of embeddings kept in the FastEmbed LRU cache
    #[serde(default = "default_cache_size")]
    pub embedding_cache_size: usize,

    /// Timeout for a single embedding call
    #[serde(default = "default_embed_timeout")]
    pub embed_timeout_secs: u64,

    /// Timeout for a single persistence call
    #[serde(default = "default_persist_timeout")]
    pub persist_timeout_secs: u64,

    /// Window used to rank trending clusters
    #[serde(default = "default_trending_window")]
    pub trending_window_hours: u32,

    /// Default number of records returned by list queries
    #[serde(default = "default_trend_limit")]
    pub default_trend_limit: usize,

    /// Database path (defaults to the platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

fn default_similarity_threshold() -> f32 {
    0.75
}

fn default_hashing_dimension() -> usize {
    384
}

fn default_cache_size() -> usize {
    1000
}

fn default_embed_timeout() -> u64 {
    30
}

fn default_persist_timeout() -> u64 {
    10
}

fn default_trending_window() -> u32 {
    24
}

fn default_trend_limit() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            embedder: EmbedderKind::default(),
            hashing_dimension: default_hashing_dimension(),
            embedding_cache_size: default_cache_size(),
            embed_timeout_secs: default_embed_timeout(),
            persist_timeout_secs: default_persist_timeout(),
            trending_window_hours: default_trending_window(),
            default_trend_limit: default_trend_limit(),
            db_path: None,
            debug: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/wavesight/config.{WAVESIGHT_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("WAVESIGHT_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = Self::config_dir() {
            let config_path = config_dir.join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var("WAVESIGHT_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }

        if let Ok(threshold) = std::env::var("WAVESIGHT_SIMILARITY_THRESHOLD") {
            self.similarity_threshold = threshold.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "WAVESIGHT_SIMILARITY_THRESHOLD is not a number: {}",
                    threshold
                ))
            })?;
        }

        if let Ok(embedder) = std::env::var("WAVESIGHT_EMBEDDER") {
            self.embedder = embedder.parse()?;
        }

        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "similarity_threshold must be between -1.0 and 1.0, got {}",
                self.similarity_threshold
            )));
        }

        let positive = [
            ("hashing_dimension", self.hashing_dimension as u64),
            ("embedding_cache_size", self.embedding_cache_size as u64),
            ("embed_timeout_secs", self.embed_timeout_secs),
            ("persist_timeout_secs", self.persist_timeout_secs),
            ("trending_window_hours", u64::from(self.trending_window_hours)),
            ("default_trend_limit", self.default_trend_limit as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_secs(self.persist_timeout_secs)
    }

    /// Resolve the database path, falling back to the platform data dir
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "wavesight", "wavesight")
                .map(|dirs| dirs.data_dir().join("wavesight.db"))
                .unwrap_or_else(|| PathBuf::from("wavesight.db"))
        })
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("wavesight"))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
