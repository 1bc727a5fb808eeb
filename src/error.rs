use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictorError>;

#[derive(Debug, Error)]
pub enum PredictorError {
    /// Input rejected before any prediction was generated.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The genetic + Poisson path could not run; callers fall back to the baseline analyzer.
    #[error("Enhanced predictor unavailable: {0}")]
    EnrichmentUnavailable(String),

    #[error("Prediction with id {0} not found")]
    LookupNotFound(u64),

    #[error("Head-to-head match with id {0} not found")]
    HeadToHeadNotFound(u64),

    #[error("Head-to-head history is full ({max} matches maximum)")]
    HeadToHeadFull { max: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<csv::Error> for PredictorError {
    fn from(err: csv::Error) -> Self {
        PredictorError::Internal(format!("CSV export failed: {}", err))
    }
}
