//! Configuration management for datacrew
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/datacrew/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{CrewError, Result};

/// Main configuration for datacrew
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completions provider configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Team behavior configuration
    #[serde(default)]
    pub team: TeamConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL (default: https://api.openai.com/v1)
    pub base_url: String,
    /// API key. Never written to the config file.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model used by every role and by the speaker selector
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string. Never written to the config file.
    #[serde(default, skip_serializing)]
    pub url: Option<String>,
    /// Pool size
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Schema whose tables are described to the team
    pub schema: String,
    /// Rows returned to the team per query; the rest are dropped
    pub max_rows: usize,
}

/// How the next speaker is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Fixed declared order
    RoundRobin,
    /// Ask the model who should speak next
    Model,
}

impl std::str::FromStr for SelectorKind {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "round_robin" | "round-robin" | "roundrobin" => Ok(Self::RoundRobin),
            "model" | "selector" => Ok(Self::Model),
            other => Err(CrewError::config(format!("Unknown selector '{}'", other))),
        }
    }
}

/// Team behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    /// Maximum turns before the run gives up
    /// Default: 10
    pub max_turns: usize,
    /// Speaker selection policy
    pub selector: SelectorKind,
    /// Keyword that ends the run successfully
    pub termination_token: String,
    /// Whether the analyst summarizes query results before handing off
    pub reflect_on_tool_use: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4".to_string(),
            temperature: 0.0,
            timeout_secs: 120,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 30,
            schema: "public".to_string(),
            max_rows: 100,
        }
    }
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            selector: SelectorKind::Model,
            termination_token: "APPROVED".to_string(),
            reflect_on_tool_use: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("datacrew")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: env vars > config file > defaults
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = if Self::config_file().exists() {
            Self::load_from_file()?
        } else {
            Self::default()
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        let content = fs::read_to_string(&config_path)
            .map_err(|e| CrewError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CrewError::config(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.openai.api_key = Some(key);
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = base_url;
        }
        if let Some(model) = lookup("DATACREW_MODEL") {
            self.openai.model = model;
        }
        if let Some(turns) = lookup("DATACREW_MAX_TURNS") {
            self.team.max_turns = turns.parse().map_err(|_| {
                CrewError::config(format!("DATACREW_MAX_TURNS must be a number, got '{}'", turns))
            })?;
        }
        if let Some(selector) = lookup("DATACREW_SELECTOR") {
            self.team.selector = selector.parse()?;
        }
        if let Some(level) = lookup("DATACREW_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Check that everything needed to start a run is present
    pub fn validate(&self) -> Result<()> {
        if self.database.url.as_deref().map_or(true, str::is_empty) {
            return Err(CrewError::config("DATABASE_URL not found in environment or .env file"));
        }
        if self.openai.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(CrewError::config("OPENAI_API_KEY not found in environment or .env file"));
        }
        if self.team.max_turns == 0 {
            return Err(CrewError::config("team.max_turns must be at least 1"));
        }
        if self.team.termination_token.trim().is_empty() {
            return Err(CrewError::config("team.termination_token must not be empty"));
        }
        Ok(())
    }
}
