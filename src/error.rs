use thiserror::Error;

/// Failures that abort a timesheet extraction. Malformed rows are not
/// errors; they come back as [`crate::model::SkippedRow`] records.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Could not parse timesheet markup: {0}")]
    ParseFailure(String),
}

impl ExtractError {
    /// HTTP status the route layer answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractError::InvalidDateFormat(_) => 400,
            ExtractError::ParseFailure(_) => 502,
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
