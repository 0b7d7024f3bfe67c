use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the simulator
///
/// Numeric edge cases inside the cell model are never reported here; they are floored.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid time step: {0}s (must be positive and finite)")]
    InvalidTimeStep(f64),

    #[error("Load profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Unknown cell parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid initial condition: {0}")]
    InvalidInitialCondition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}
