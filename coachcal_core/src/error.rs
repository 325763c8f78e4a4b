//! Error types for the coachcal_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for coachcal_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A lifecycle action was attempted from a state that does not allow it
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A scoring or logging input was outside its documented range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Mutation attempted on an attempt that already has `completed_at` set
    #[error("Attempt {0} is already completed")]
    AlreadyCompleted(uuid::Uuid),

    /// Referenced template, attempt or exercise does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The acting athlete does not own the target row
    #[error("Athlete {actor} does not own {what}")]
    Forbidden { actor: uuid::Uuid, what: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for the domain errors a caller caused, as opposed to storage failures
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition(_)
                | Error::InvalidInput(_)
                | Error::AlreadyCompleted(_)
                | Error::NotFound(_)
                | Error::Forbidden { .. }
        )
    }
}
