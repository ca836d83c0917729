use crate::analysis::{BatchError, BuildError, InvalidContext, RegistryError};
use crate::config::constants::ConstantsError;
use crate::config::ConfigError;
use crate::facts::FactStoreError;
use crate::telemetry::TelemetryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Constants(ConstantsError),
    Registry(RegistryError),
    FactStore(FactStoreError),
    Build(BuildError),
    Analysis(InvalidContext),
    Batch(BatchError),
    Output(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Constants(err) => write!(f, "constants error: {}", err),
            AppError::Registry(err) => write!(f, "registry error: {}", err),
            AppError::FactStore(err) => write!(f, "fact store error: {}", err),
            AppError::Build(err) => write!(f, "context error: {}", err),
            AppError::Analysis(err) => write!(f, "analysis error: {}", err),
            AppError::Batch(err) => write!(f, "batch error: {}", err),
            AppError::Output(err) => write!(f, "output error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Constants(err) => Some(err),
            AppError::Registry(err) => Some(err),
            AppError::FactStore(err) => Some(err),
            AppError::Build(err) => Some(err),
            AppError::Analysis(err) => Some(err),
            AppError::Batch(err) => Some(err),
            AppError::Output(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ConstantsError> for AppError {
    fn from(value: ConstantsError) -> Self {
        Self::Constants(value)
    }
}

impl From<RegistryError> for AppError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

impl From<FactStoreError> for AppError {
    fn from(value: FactStoreError) -> Self {
        Self::FactStore(value)
    }
}

impl From<BuildError> for AppError {
    fn from(value: BuildError) -> Self {
        Self::Build(value)
    }
}

impl From<InvalidContext> for AppError {
    fn from(value: InvalidContext) -> Self {
        Self::Analysis(value)
    }
}

impl From<BatchError> for AppError {
    fn from(value: BatchError) -> Self {
        Self::Batch(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}
