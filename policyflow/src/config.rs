//! Application configuration.
//!
//! Sources, later ones winning: `config/default.*`, `config/local.*`, then
//! `POLICYFLOW__SECTION__KEY` environment variables.

use policyflow_core::RunnerConfig;
use policyflow_logger::LogFormat;
use policyflow_runtime::{GenovaConfig, DEFAULT_BASE_URL, DEFAULT_DOCUMENT_BASE};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub genova: GenovaSettings,
    pub runner: RunnerSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenovaSettings {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Base URL of the printable policy documents
    pub document_base: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    pub step_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for GenovaSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30_000,
            document_base: DEFAULT_DOCUMENT_BASE.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` and then the layered sources
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_sources(
            config::Config::builder()
                .add_source(config::File::with_name("config/default").required(false))
                .add_source(config::File::with_name("config/local").required(false))
                .add_source(
                    config::Environment::with_prefix("POLICYFLOW")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    pub fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn genova_config(&self) -> GenovaConfig {
        GenovaConfig {
            base_url: self.genova.base_url.clone(),
            timeout: Duration::from_millis(self.genova.timeout_ms),
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            step_timeout: self.runner.step_timeout_ms.map(Duration::from_millis),
        }
    }
}
