//! Configuration management for the credit risk service

use crate::types::risk::RiskThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "CREDIT_RISK_CONFIG";
/// Prefix of environment overrides, e.g. `CREDIT_RISK_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "CREDIT_RISK";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub risk: RiskThresholds,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker threads, 0 keeps the actix default (one per core)
    #[serde(default)]
    pub workers: usize,
    /// Allowed CORS origins, `*` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path of the trained artifact (`.json`, or `.onnx` with the `onnx` feature)
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Number of threads for ONNX inference
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_path() -> String {
    "models/final_model_auc.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between summaries, 0 disables the periodic reporter
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: default_report_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `$CREDIT_RISK_CONFIG` or the default path
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path; a missing file falls back to
    /// defaults, environment variables override both
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let risk = &self.risk;
        if !(0.0..=1.0).contains(&risk.low) || !(0.0..=1.0).contains(&risk.medium) {
            anyhow::bail!("risk thresholds must lie in [0, 1]");
        }
        if risk.low > risk.medium {
            anyhow::bail!(
                "risk.low ({}) must not exceed risk.medium ({})",
                risk.low,
                risk.medium
            );
        }
        Ok(())
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            risk: RiskThresholds::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
