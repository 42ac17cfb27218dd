use thiserror::Error;

/// Failure taxonomy for the forecasting pipeline.
/// Every stage surfaces one of these to the caller; nothing is printed
/// and swallowed, and nothing is retried automatically.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Empty, unsorted, or otherwise unusable input series
    #[error("data validation failed: {0}")]
    DataValidation(String),

    /// Training slice has zero range; min-max scaling would divide by zero
    #[error("degenerate scale: training data is constant at {value}")]
    DegenerateScale { value: f64 },

    /// Series too short to produce at least one window
    #[error("insufficient data: {len} points cannot be windowed with time_step {time_step}")]
    InsufficientData { len: usize, time_step: usize },

    /// Evaluator inputs of different (or zero) length
    #[error("shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Model artifact directory/write/read failure
    #[error("model persistence failed: {0}")]
    Persistence(String),

    /// Training aborted via the cancellation token
    #[error("training cancelled")]
    Cancelled,
}

impl ForecastError {
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        ForecastError::Persistence(err.to_string())
    }
}
