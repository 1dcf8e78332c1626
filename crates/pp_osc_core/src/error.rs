use thiserror::Error;

/// Boundary errors. The integration itself never fails; invalid arithmetic
/// shows up as NaN in the trajectory instead.
#[derive(Debug, Error)]
pub enum OscillatorError {
    #[error("tail percentage must lie in (0, 100], got {0}")]
    InvalidTailPercent(f64),
    #[error("unknown metric \"{0}\" (expected amplitude, period or period_spectral)")]
    UnknownMetric(String),
    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),
    #[error("invalid sweep: {0}")]
    InvalidSweep(String),
    #[error("modification \"{0}\" not found")]
    ModificationNotFound(String),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OscillatorError>;
