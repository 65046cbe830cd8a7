use crate::dns::{NameError, UnknownRecordType};
use thiserror::Error;

/// Failures of the checker's collaborators.
///
/// Rule violations found in a zone are never reported through this type; they
/// end up as diagnostics in the zone report.
#[derive(Error, Debug, Clone)]
pub enum CheckError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Invalid domain name: {0}")]
    InvalidName(#[from] NameError),

    #[error(transparent)]
    UnknownType(#[from] UnknownRecordType),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid NSEC3 apex length limit: {0} (must be between 1 and 255)")]
    InvalidNsec3Limit(usize),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
