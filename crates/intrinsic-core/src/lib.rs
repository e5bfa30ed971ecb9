pub mod error;
pub mod provider;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

pub use error::ValuationError;
pub use provider::{FinancialDataProvider, FinancialSnapshot, SnapshotField};
pub use types::*;

/// Standard result type for all intrinsic operations
pub type ValuationResult<T> = Result<T, ValuationError>;
