use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnderwriteError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl UnderwriteError {
    /// Validation failure for a value outside its documented closed interval.
    pub(crate) fn out_of_range(field: &str, value: f64, min: f64, max: f64) -> Self {
        UnderwriteError::InvalidInput {
            field: field.into(),
            reason: format!("must be within [{min}, {max}], got {value}"),
        }
    }
}

impl From<serde_json::Error> for UnderwriteError {
    fn from(e: serde_json::Error) -> Self {
        UnderwriteError::SerializationError(e.to_string())
    }
}
