use thiserror::Error;

/// Every way a stepwise operator can refuse its input.
///
/// Operators never coerce a bad parameter into a default: each condition is surfaced
/// to the caller as its own variant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Invalid index at position {position}: {reason}")]
    InvalidIndex { position: usize, reason: String },

    #[error("Expected {expected} values to match the index, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Unsupported window policy: {0}")]
    UnsupportedPolicy(String),

    #[error("Unsupported integration method: {0}")]
    UnsupportedMethod(String),

    #[error("Unsupported sign: {0}")]
    UnsupportedSign(String),

    #[error("Unsupported rectangle step: {0}")]
    UnsupportedStep(String),

    #[error("At least one input is required")]
    EmptyInput,

    #[error("Missing values must be dropped prior to alignment")]
    MissingValues,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Domain has zero width")]
    DegenerateDomain,

    #[error("No column named '{0}'")]
    MissingColumn(String),

    #[error("Column '{column}' holds non-numeric values")]
    NonNumeric { column: String },
}

/// Check that `index` is usable as a time axis: finite and strictly increasing.
pub fn validate_index(index: &[f64]) -> Result<(), AnalysisError> {
    for (position, ts) in index.iter().enumerate() {
        if !ts.is_finite() {
            return Err(AnalysisError::InvalidIndex {
                position,
                reason: format!("timestamp {ts} is not finite"),
            });
        }
        if position > 0 && index[position - 1] >= *ts {
            let reason = if index[position - 1] == *ts {
                format!("duplicate timestamp {ts}")
            } else {
                format!("timestamp {ts} follows {}", index[position - 1])
            };
            return Err(AnalysisError::InvalidIndex { position, reason });
        }
    }
    Ok(())
}
