use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::maker::{MakerConfig, MakerResult, RunnerConfig};

/// Main configuration struct
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Strategy configuration (symbol, ladder, sizing, reset window)
    pub strategy: MakerConfig,
    /// Runner error policy
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a configuration file, then validate the strategy section
    pub fn new(config_path: &str) -> MakerResult<Self> {
        // Pick up APP_* overrides from a local .env, if any
        dotenvy::dotenv().ok();

        let s = Config::builder()
            .add_source(File::with_name(config_path))
            // Environment variables override the file
            // e.g. APP_STRATEGY__ORDER_COUNT=20
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::finish(s)
    }

    /// Load settings from a TOML string (no environment overrides)
    pub fn from_toml(content: &str) -> MakerResult<Self> {
        let s = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        Self::finish(s)
    }

    fn finish(s: Config) -> MakerResult<Self> {
        let settings: Self = s.try_deserialize()?;
        settings.strategy.validate()?;
        Ok(settings)
    }
}
