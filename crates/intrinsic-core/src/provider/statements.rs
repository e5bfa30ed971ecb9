use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Market profile of a listed company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
}

/// Most recent annual income statement lines needed for valuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_tax_expense: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_before_tax: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_expense: Option<Money>,
    /// Diluted weighted average shares, used when no share count is reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_average_shares_diluted: Option<Decimal>,
}

/// Most recent balance sheet lines needed for valuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_and_cash_equivalents: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_and_short_term_investments: Option<Money>,
}

/// Most recent cash flow statement lines needed for valuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_cash_flow: Option<Money>,
    /// Reported sign varies by source; treated as an outflow either way
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capital_expenditure: Option<Money>,
}

/// Every statement family for one company. Missing families are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyStatements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<CompanyProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_statement: Option<IncomeStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_sheet: Option<BalanceSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_flow: Option<CashFlowStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
}
