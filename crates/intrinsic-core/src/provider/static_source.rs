use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ValuationError;
use crate::ValuationResult;

use super::adapter::StatementSource;
use super::normalize_ticker;
use super::statements::{
    BalanceSheet, CashFlowStatement, CompanyProfile, CompanyStatements, IncomeStatement,
};

/// In-memory statement source keyed by ticker.
///
/// Deserialises from a JSON object mapping tickers to [`CompanyStatements`],
/// which is how offline data files are supplied to the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticSource {
    companies: HashMap<String, CompanyStatements>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(mut self, ticker: &str, statements: CompanyStatements) -> Self {
        self.insert(ticker, statements);
        self
    }

    pub fn insert(&mut self, ticker: &str, statements: CompanyStatements) {
        self.companies.insert(normalize_ticker(ticker), statements);
    }

    /// Parse a JSON document of the form `{ "TICKER": { ...statements } }`.
    pub fn from_json_str(json: &str) -> ValuationResult<Self> {
        let raw: HashMap<String, CompanyStatements> = serde_json::from_str(json)?;
        Ok(Self::from_map(raw))
    }

    pub fn from_json_value(value: serde_json::Value) -> ValuationResult<Self> {
        let raw: HashMap<String, CompanyStatements> = serde_json::from_value(value)?;
        Ok(Self::from_map(raw))
    }

    fn from_map(raw: HashMap<String, CompanyStatements>) -> Self {
        let companies = raw
            .into_iter()
            .map(|(ticker, statements)| (normalize_ticker(&ticker), statements))
            .collect();
        Self { companies }
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    fn company(&self, ticker: &str) -> ValuationResult<&CompanyStatements> {
        self.companies
            .get(&normalize_ticker(ticker))
            .ok_or_else(|| ValuationError::unavailable("ticker", format!("no data for {ticker}")))
    }

    fn family<T: Clone>(
        &self,
        ticker: &str,
        name: &str,
        pick: impl FnOnce(&CompanyStatements) -> Option<&T>,
    ) -> ValuationResult<T> {
        pick(self.company(ticker)?)
            .cloned()
            .ok_or_else(|| ValuationError::unavailable(name, format!("no {name} for {ticker}")))
    }
}

impl StatementSource for StaticSource {
    fn profile(&self, ticker: &str) -> ValuationResult<CompanyProfile> {
        self.family(ticker, "profile", |c| c.profile.as_ref())
    }

    fn income_statement(&self, ticker: &str) -> ValuationResult<IncomeStatement> {
        self.family(ticker, "income_statement", |c| c.income_statement.as_ref())
    }

    fn balance_sheet(&self, ticker: &str) -> ValuationResult<BalanceSheet> {
        self.family(ticker, "balance_sheet", |c| c.balance_sheet.as_ref())
    }

    fn cash_flow(&self, ticker: &str) -> ValuationResult<CashFlowStatement> {
        self.family(ticker, "cash_flow", |c| c.cash_flow.as_ref())
    }

    fn shares_outstanding(&self, ticker: &str) -> ValuationResult<Decimal> {
        self.family(ticker, "shares_outstanding", |c| c.shares_outstanding.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FIXTURE: &str = r#"{
        "msft": {
            "profile": { "market_cap": 3100000000000, "beta": 0.9 },
            "balance_sheet": { "total_debt": "97000000000" },
            "shares_outstanding": 7430000000
        }
    }"#;

    #[test]
    fn test_from_json_normalises_tickers() {
        let source = StaticSource::from_json_str(FIXTURE).unwrap();
        assert_eq!(source.len(), 1);

        let profile = source.profile("MSFT").unwrap();
        assert_eq!(profile.market_cap, Some(dec!(3100000000000)));
        assert_eq!(profile.beta, Some(dec!(0.9)));
    }

    #[test]
    fn test_numbers_and_strings_both_parse() {
        let source = StaticSource::from_json_str(FIXTURE).unwrap();
        let balance = source.balance_sheet("msft").unwrap();
        assert_eq!(balance.total_debt, Some(dec!(97000000000)));
        assert_eq!(source.shares_outstanding("msft").unwrap(), dec!(7430000000));
    }

    #[test]
    fn test_missing_family_is_unavailable() {
        let source = StaticSource::from_json_str(FIXTURE).unwrap();
        match source.cash_flow("MSFT").unwrap_err() {
            ValuationError::DataUnavailable { field, .. } => assert_eq!(field, "cash_flow"),
            e => panic!("Expected DataUnavailable, got {e:?}"),
        }
    }

    #[test]
    fn test_unknown_ticker_is_unavailable() {
        let source = StaticSource::new();
        assert!(source.is_empty());
        assert!(matches!(
            source.profile("AAPL"),
            Err(ValuationError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = StaticSource::from_json_str("[1, 2").unwrap_err();
        assert!(matches!(err, ValuationError::SerializationError(_)));
    }
}
