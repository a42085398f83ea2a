use thiserror::Error;

/// Errors raised by the scoring engine.
///
/// Missing or partial market data is never an error; every formula has a
/// neutral fallback. These variants signal a bug or a bad configuration in
/// the caller.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Cannot select from an empty candidate list")]
    EmptyCandidates,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
