use thiserror::Error;

/// Crate error type.
///
/// Only logic faults are errors. Stochastic death, developmental stall
/// and nest-capacity exhaustion are ordinary values handled by the state
/// machines, never `Err`.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Individual not found: {0:?}")]
    IndividualNotFound(crate::core::types::IndividualId),

    #[error("Invalid stage transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
