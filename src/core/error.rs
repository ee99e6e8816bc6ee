use thiserror::Error;

/// Failures raised by schedule construction and tax evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaxError {
    /// Malformed schedule input, negative income or an out-of-range fraction.
    #[error("validation error: {0}")]
    Validation(String),

    /// No regional schedule is registered under the requested name.
    #[error("not found: {0}")]
    NotFound(String),

    /// A schedule that passed construction failed to place a valid value.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type TaxResult<T> = Result<T, TaxError>;
