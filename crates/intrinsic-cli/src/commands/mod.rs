pub mod data;
pub mod interactive;
pub mod snapshot;
pub mod valuation;
