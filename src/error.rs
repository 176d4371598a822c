use thiserror::Error;

/// Errors raised by the progress engine. Zero sessions is never an error;
/// it surfaces as the `not-addressed` rating instead.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
}
