//! Data Provider Adapter.
//!
//! Wraps an external market-data source and turns its raw statements into a
//! [`FinancialSnapshot`]. Fetching is total: a field that cannot be retrieved
//! is set to zero, listed in [`FinancialSnapshot::unavailable`], and logged.

pub mod adapter;
pub mod cache;
#[cfg(feature = "fmp")]
pub mod fmp;
pub mod static_source;
pub mod statements;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Money, Rate};

pub use adapter::{SnapshotAdapter, StatementSource};
pub use cache::CachedProvider;
#[cfg(feature = "fmp")]
pub use fmp::FmpSource;
pub use static_source::StaticSource;
pub use statements::{
    BalanceSheet, CashFlowStatement, CompanyProfile, CompanyStatements, IncomeStatement,
};

/// Anything that can produce a snapshot for a ticker.
///
/// Implementations must never fail: missing data degrades to zero.
pub trait FinancialDataProvider {
    fn fetch(&self, ticker: &str) -> FinancialSnapshot;
}

impl<P: FinancialDataProvider + ?Sized> FinancialDataProvider for &P {
    fn fetch(&self, ticker: &str) -> FinancialSnapshot {
        (**self).fetch(ticker)
    }
}

impl<P: FinancialDataProvider + ?Sized> FinancialDataProvider for Box<P> {
    fn fetch(&self, ticker: &str) -> FinancialSnapshot {
        (**self).fetch(ticker)
    }
}

/// Identifies a single snapshot field, used for degradation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotField {
    Equity,
    Debt,
    Beta,
    TaxRate,
    CostOfDebt,
    FreeCashFlow,
    SharesOutstanding,
    Cash,
}

impl SnapshotField {
    pub const ALL: [SnapshotField; 8] = [
        SnapshotField::Equity,
        SnapshotField::Debt,
        SnapshotField::Beta,
        SnapshotField::TaxRate,
        SnapshotField::CostOfDebt,
        SnapshotField::FreeCashFlow,
        SnapshotField::SharesOutstanding,
        SnapshotField::Cash,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            SnapshotField::Equity => "equity",
            SnapshotField::Debt => "debt",
            SnapshotField::Beta => "beta",
            SnapshotField::TaxRate => "tax_rate",
            SnapshotField::CostOfDebt => "cost_of_debt",
            SnapshotField::FreeCashFlow => "free_cash_flow",
            SnapshotField::SharesOutstanding => "shares_outstanding",
            SnapshotField::Cash => "cash",
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fundamental data for one ticker, fetched on demand.
///
/// Fields are fetched independently and may be mutually stale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub ticker: String,
    /// Market capitalisation
    pub equity: Money,
    /// Total debt
    pub debt: Money,
    pub beta: Decimal,
    /// Effective tax rate: |income tax expense| / income before tax
    pub tax_rate: Rate,
    /// Pre-tax cost of debt: |interest expense| / total debt
    pub cost_of_debt: Rate,
    /// Most recent period free cash flow (signed)
    pub free_cash_flow: Money,
    pub shares_outstanding: Decimal,
    /// Cash and equivalents
    pub cash: Money,
    /// Fields that could not be retrieved and were defaulted to zero
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<SnapshotField>,
}

impl FinancialSnapshot {
    /// An all-zero snapshot for `ticker`.
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }

    /// Net debt = total debt - cash, saturating at the `Decimal` bounds.
    pub fn net_debt(&self) -> Money {
        self.debt.saturating_sub(self.cash)
    }

    pub fn is_available(&self, field: SnapshotField) -> bool {
        !self.unavailable.contains(&field)
    }
}

/// Canonical form of a ticker symbol used for lookups and cache keys.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_net_debt() {
        let mut snapshot = FinancialSnapshot::new("UNH");
        snapshot.debt = dec!(75000000000);
        snapshot.cash = dec!(25000000000);
        assert_eq!(snapshot.net_debt(), dec!(50000000000));
    }

    #[test]
    fn test_net_debt_negative_when_cash_exceeds_debt() {
        let mut snapshot = FinancialSnapshot::new("CASHCO");
        snapshot.debt = dec!(10);
        snapshot.cash = dec!(30);
        assert_eq!(snapshot.net_debt(), dec!(-20));
    }

    #[test]
    fn test_new_snapshot_is_zeroed() {
        let snapshot = FinancialSnapshot::new("ZERO");
        assert_eq!(snapshot.ticker, "ZERO");
        assert!(snapshot.equity.is_zero());
        assert!(snapshot.free_cash_flow.is_zero());
        assert!(snapshot.unavailable.is_empty());
        assert!(SnapshotField::ALL
            .iter()
            .all(|f| snapshot.is_available(*f)));
    }

    #[test]
    fn test_field_names_match_serde() {
        for field in SnapshotField::ALL {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, field.as_str());
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("  brk.b "), "BRK.B");
        assert_eq!(normalize_ticker("UNH"), "UNH");
    }
}
