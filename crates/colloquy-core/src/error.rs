use thiserror::Error;

use crate::exchange::Stage;

/// A filter or generator call that could not be completed.
///
/// Distinct from a blocking verdict: the remote service never answered,
/// so no decision about the text exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Why an exchange ended before producing an answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeFault {
    #[error("Content filter unavailable at {stage} stage: {cause}")]
    FilterUnavailable { stage: Stage, cause: Unavailable },

    #[error("Content filter blocked {stage}: {}", .violations.join(", "))]
    FilterBlocked { stage: Stage, violations: Vec<String> },

    #[error("Response generator unavailable: {0}")]
    GenerationUnavailable(Unavailable),
}

/// Precondition failures of a pipeline submission. Nothing is appended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("Message is empty")]
    EmptyMessage,
}

/// Failure to mirror an exchange to an external store. Never fatal.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Mirror IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mirror serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Mirror transport error: {0}")]
    Transport(String),

    #[error("Mirror store returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable {0} is not set")]
    MissingSecret(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
