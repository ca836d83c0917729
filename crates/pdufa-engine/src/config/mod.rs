pub mod constants;

use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::analysis::TrustPolicy;
use constants::{CalculatorConfig, ConstantsError};

/// Distinguishes runtime behavior for different stages of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the engine and its command line front end.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub analysis: AnalysisSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("PDUFA_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("PDUFA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let constants_path = env::var("PDUFA_CONSTANTS_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let trust_policy = match env::var("PDUFA_TRUST_POLICY") {
            Ok(value) => TrustPolicy::parse(&value)
                .ok_or(ConfigError::InvalidTrustPolicy { value })?,
            Err(_) => TrustPolicy::default(),
        };

        let batch_concurrency = env::var("PDUFA_BATCH_CONCURRENCY")
            .unwrap_or_else(|_| "4".to_string())
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|workers| *workers > 0)
            .ok_or(ConfigError::InvalidConcurrency)?;

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            analysis: AnalysisSettings {
                constants_path,
                trust_policy,
                batch_concurrency,
            },
        })
    }
}

/// Knobs for the probability engine itself.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub constants_path: Option<PathBuf>,
    pub trust_policy: TrustPolicy,
    pub batch_concurrency: usize,
}

impl AnalysisSettings {
    /// Loads the calculator constants from the configured file, falling back to
    /// the compiled-in defaults when no path is set.
    pub fn calculator_config(&self) -> Result<CalculatorConfig, ConstantsError> {
        match &self.constants_path {
            Some(path) => CalculatorConfig::from_path(path),
            None => Ok(CalculatorConfig::default()),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidConcurrency,
    InvalidTrustPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidConcurrency => {
                write!(f, "PDUFA_BATCH_CONCURRENCY must be a positive integer")
            }
            ConfigError::InvalidTrustPolicy { value } => write!(
                f,
                "PDUFA_TRUST_POLICY must be 'standard' or 'strict', got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
