//! Configuration management for the carousel relay
//!
//! This module handles loading and validating configuration from a TOML
//! file and environment variables. Invalid configuration is rejected at
//! startup, before the scheduler or ledger exist.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scheduler::{PublishingWindow, SelectionPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transport configuration
    pub transport: TransportConfig,

    /// Source and destination feeds
    pub feeds: FeedsConfig,

    /// Scheduling configuration
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Content filter configuration
    #[serde(default)]
    pub filter: FilterConfig,

    /// Ledger storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Bot API base URL
    pub api_url: String,

    /// Bot token
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Feed routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Feed items are collected from
    pub source: String,

    /// Feed items are republished to
    pub target: String,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between scheduled ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// First hour (inclusive) of the publishing window
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,

    /// End hour (exclusive) of the publishing window
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,

    /// IANA time zone the window is evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Maximum items published per tick
    #[serde(default = "default_quota")]
    pub quota_per_tick: usize,

    /// Candidate source mode: "historical" or "poll"
    #[serde(default = "default_source_mode")]
    pub source_mode: SourceMode,

    /// Lookback window in hours (historical mode)
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u64,

    /// Maximum items fetched per tick (poll mode)
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    /// Selection policy
    #[serde(default)]
    pub selection: SelectionPolicy,

    /// Delay between consecutive sends in milliseconds
    #[serde(default = "default_inter_send_delay_ms")]
    pub inter_send_delay_ms: u64,

    /// Publish attempts per item before the failure is permanent
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            timezone: default_timezone(),
            quota_per_tick: default_quota(),
            source_mode: default_source_mode(),
            lookback_hours: default_lookback_hours(),
            max_batch: default_max_batch(),
            selection: SelectionPolicy::default(),
            inter_send_delay_ms: default_inter_send_delay_ms(),
            max_send_attempts: default_max_send_attempts(),
        }
    }
}

/// Which candidate source strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Bounded lookback window (pull model)
    Historical,
    /// Incremental cursor-based polling (poll model)
    Poll,
}

/// Content filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    /// Terms that reject an item when found in its cleaned text
    #[serde(default)]
    pub banned_terms: Vec<String>,
}

/// Ledger storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Ledger backend: "file" or "sqlite"
    #[serde(default = "default_backend")]
    pub backend: LedgerBackend,

    /// Path of the ledger file or database
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_ledger_path(),
        }
    }
}

/// Selectable ledger backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    File,
    Sqlite,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_interval_secs() -> u64 {
    60
}

fn default_start_hour() -> u32 {
    12
}

fn default_end_hour() -> u32 {
    19
}

fn default_timezone() -> String {
    "Europe/Istanbul".to_string()
}

fn default_quota() -> usize {
    1
}

fn default_source_mode() -> SourceMode {
    SourceMode::Historical
}

fn default_lookback_hours() -> u64 {
    48
}

fn default_max_batch() -> usize {
    100
}

fn default_inter_send_delay_ms() -> u64 {
    3000
}

fn default_max_send_attempts() -> u32 {
    3
}

fn default_backend() -> LedgerBackend {
    LedgerBackend::File
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment-variable overrides for deployment secrets.
    /// The token and feed ids are the values most often injected by the
    /// hosting environment rather than committed to a config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("CAROUSEL_BOT_TOKEN") {
            self.transport.token = token;
        }
        if let Ok(api_url) = std::env::var("CAROUSEL_API_URL") {
            self.transport.api_url = api_url;
        }
        if let Ok(source) = std::env::var("CAROUSEL_SOURCE_FEED") {
            self.feeds.source = source;
        }
        if let Ok(target) = std::env::var("CAROUSEL_TARGET_FEED") {
            self.feeds.target = target;
        }
    }

    /// Publishing window derived from the schedule section.
    pub fn publishing_window(&self) -> PublishingWindow {
        PublishingWindow {
            start_hour: self.schedule.start_hour,
            end_hour: self.schedule.end_hour,
            quota_per_tick: self.schedule.quota_per_tick,
            timezone: self.schedule.timezone.clone(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.transport.api_url.is_empty() {
            anyhow::bail!("transport.api_url must be set");
        }

        if self.transport.token.is_empty() {
            anyhow::bail!("transport.token must be set (or CAROUSEL_BOT_TOKEN)");
        }

        if self.feeds.source.is_empty() || self.feeds.target.is_empty() {
            anyhow::bail!("feeds.source and feeds.target must be set");
        }

        if self.feeds.source == self.feeds.target {
            anyhow::bail!("feeds.source and feeds.target must differ");
        }

        if self.schedule.interval_secs == 0 {
            anyhow::bail!("schedule.interval_secs must be greater than 0");
        }

        if self.schedule.max_batch == 0 {
            anyhow::bail!("schedule.max_batch must be greater than 0");
        }

        if self.schedule.max_send_attempts == 0 {
            anyhow::bail!("schedule.max_send_attempts must be greater than 0");
        }

        self.publishing_window()
            .validate()
            .map_err(|e| anyhow::anyhow!("{e}"))?;

        Ok(())
    }
}
