//! Domain-level error taxonomy for fleetgrade.

/// Fleetgrade domain errors.
///
/// Only internal orchestration failures surface through this enum; failures
/// of user-supplied prepare/task/check commands are absorbed into scores or
/// logged, never raised.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("fork discovery failed: {0}")]
    Discovery(String),

    #[error("repository sync failed: {0}")]
    Sync(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("process error: {0}")]
    Process(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fleetgrade domain operations.
pub type Result<T> = std::result::Result<T, FleetError>;
