use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Invalid parameter: {field} — {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Data unavailable: {field} — {reason}")]
    DataUnavailable { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Arithmetic overflow in {context}")]
    Overflow { context: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ValuationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValuationError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(context: &str) -> Self {
        ValuationError::Overflow {
            context: context.into(),
        }
    }

    pub(crate) fn unavailable(field: &str, reason: impl Into<String>) -> Self {
        ValuationError::DataUnavailable {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::SerializationError(e.to_string())
    }
}

#[cfg(feature = "fmp")]
impl From<reqwest::Error> for ValuationError {
    fn from(e: reqwest::Error) -> Self {
        ValuationError::Provider(e.to_string())
    }
}
