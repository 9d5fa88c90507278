//! Engine errors

use crate::runtime::engine::TargetId;
use crate::util::config::ConfigError;
use thiserror::Error;

/// Errors surfaced to the host by engine-level operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Target not found: {0}")]
    TargetNotFound(TargetId),

    #[error("Project error: {0}")]
    Project(String),

    #[error("Project parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
