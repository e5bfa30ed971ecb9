use rust_decimal::Decimal;
use tracing::{debug, info_span, warn};

use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationResult;

use super::statements::{BalanceSheet, CashFlowStatement, CompanyProfile, IncomeStatement};
use super::{normalize_ticker, FinancialDataProvider, FinancialSnapshot, SnapshotField};

/// Raw collaborator behind the adapter: one fallible call per statement family.
pub trait StatementSource {
    fn profile(&self, ticker: &str) -> ValuationResult<CompanyProfile>;
    fn income_statement(&self, ticker: &str) -> ValuationResult<IncomeStatement>;
    fn balance_sheet(&self, ticker: &str) -> ValuationResult<BalanceSheet>;
    fn cash_flow(&self, ticker: &str) -> ValuationResult<CashFlowStatement>;
    fn shares_outstanding(&self, ticker: &str) -> ValuationResult<Decimal>;
}

impl<S: StatementSource + ?Sized> StatementSource for &S {
    fn profile(&self, ticker: &str) -> ValuationResult<CompanyProfile> {
        (**self).profile(ticker)
    }
    fn income_statement(&self, ticker: &str) -> ValuationResult<IncomeStatement> {
        (**self).income_statement(ticker)
    }
    fn balance_sheet(&self, ticker: &str) -> ValuationResult<BalanceSheet> {
        (**self).balance_sheet(ticker)
    }
    fn cash_flow(&self, ticker: &str) -> ValuationResult<CashFlowStatement> {
        (**self).cash_flow(ticker)
    }
    fn shares_outstanding(&self, ticker: &str) -> ValuationResult<Decimal> {
        (**self).shares_outstanding(ticker)
    }
}

/// Turns a [`StatementSource`] into a total [`FinancialDataProvider`].
///
/// Each statement family is requested once per `fetch`. Every snapshot field
/// is then derived on its own, so a failed balance sheet zeroes debt and cash
/// but leaves equity and beta intact.
#[derive(Debug, Clone)]
pub struct SnapshotAdapter<S> {
    source: S,
}

impl<S: StatementSource> SnapshotAdapter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: StatementSource> FinancialDataProvider for SnapshotAdapter<S> {
    fn fetch(&self, ticker: &str) -> FinancialSnapshot {
        let ticker = normalize_ticker(ticker);
        let span = info_span!("fetch_snapshot", ticker = %ticker);
        let _guard = span.enter();

        let profile = self.source.profile(&ticker);
        let income = self.source.income_statement(&ticker);
        let balance = self.source.balance_sheet(&ticker);
        let cash_flow = self.source.cash_flow(&ticker);
        let shares = self.source.shares_outstanding(&ticker);

        let mut snapshot = FinancialSnapshot::new(ticker);
        let mut unavailable = Vec::new();
        let mut resolve = |field: SnapshotField, value: ValuationResult<Decimal>| match value {
            Ok(v) => v,
            Err(e) => {
                warn!(field = %field, error = %e, "field unavailable, defaulting to zero");
                unavailable.push(field);
                Decimal::ZERO
            }
        };

        snapshot.equity = resolve(SnapshotField::Equity, equity(&profile));
        snapshot.debt = resolve(SnapshotField::Debt, debt(&balance));
        snapshot.beta = resolve(SnapshotField::Beta, beta(&profile));
        snapshot.tax_rate = resolve(SnapshotField::TaxRate, tax_rate(&income));
        snapshot.cost_of_debt = resolve(
            SnapshotField::CostOfDebt,
            cost_of_debt(&income, &balance),
        );
        snapshot.free_cash_flow = resolve(SnapshotField::FreeCashFlow, free_cash_flow(&cash_flow));
        snapshot.shares_outstanding = resolve(
            SnapshotField::SharesOutstanding,
            shares_outstanding(shares, &income),
        );
        snapshot.cash = resolve(SnapshotField::Cash, cash(&balance));
        snapshot.unavailable = unavailable;

        debug!(
            unavailable = snapshot.unavailable.len(),
            "snapshot assembled"
        );
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Field extractors
// ---------------------------------------------------------------------------

fn statement<'a, T>(
    result: &'a ValuationResult<T>,
    field: SnapshotField,
) -> ValuationResult<&'a T> {
    result
        .as_ref()
        .map_err(|e| ValuationError::unavailable(field.as_str(), e.to_string()))
}

fn required(value: Option<Decimal>, field: SnapshotField, line: &str) -> ValuationResult<Decimal> {
    value.ok_or_else(|| ValuationError::unavailable(field.as_str(), format!("{line} not reported")))
}

fn equity(profile: &ValuationResult<CompanyProfile>) -> ValuationResult<Money> {
    let field = SnapshotField::Equity;
    required(statement(profile, field)?.market_cap, field, "market cap")
}

fn beta(profile: &ValuationResult<CompanyProfile>) -> ValuationResult<Decimal> {
    let field = SnapshotField::Beta;
    required(statement(profile, field)?.beta, field, "beta")
}

fn debt(balance: &ValuationResult<BalanceSheet>) -> ValuationResult<Money> {
    let field = SnapshotField::Debt;
    required(statement(balance, field)?.total_debt, field, "total debt")
}

/// |income tax expense| / income before tax, clamped to [0, 1].
fn tax_rate(income: &ValuationResult<IncomeStatement>) -> ValuationResult<Rate> {
    let field = SnapshotField::TaxRate;
    let stmt = statement(income, field)?;
    let tax = required(stmt.income_tax_expense, field, "income tax expense")?;
    let pretax = required(stmt.income_before_tax, field, "income before tax")?;
    if pretax <= Decimal::ZERO {
        return Err(ValuationError::unavailable(
            field.as_str(),
            format!("income before tax is {pretax}; effective rate undefined"),
        ));
    }
    let rate = tax.abs().checked_div(pretax).ok_or_else(|| {
        ValuationError::unavailable(
            field.as_str(),
            format!("income tax expense {tax} / income before tax {pretax} overflows"),
        )
    })?;
    Ok(rate.clamp(Decimal::ZERO, Decimal::ONE))
}

/// |interest expense| / total debt.
fn cost_of_debt(
    income: &ValuationResult<IncomeStatement>,
    balance: &ValuationResult<BalanceSheet>,
) -> ValuationResult<Rate> {
    let field = SnapshotField::CostOfDebt;
    let interest = required(
        statement(income, field)?.interest_expense,
        field,
        "interest expense",
    )?;
    let total_debt = required(statement(balance, field)?.total_debt, field, "total debt")?;
    if total_debt <= Decimal::ZERO || interest.is_zero() {
        return Err(ValuationError::unavailable(
            field.as_str(),
            format!("interest expense = {interest}, total debt = {total_debt}"),
        ));
    }
    interest.abs().checked_div(total_debt).ok_or_else(|| {
        ValuationError::unavailable(
            field.as_str(),
            format!("interest expense {interest} / total debt {total_debt} overflows"),
        )
    })
}

/// Reported FCF, else operating cash flow less capital expenditure.
fn free_cash_flow(cash_flow: &ValuationResult<CashFlowStatement>) -> ValuationResult<Money> {
    let field = SnapshotField::FreeCashFlow;
    let stmt = statement(cash_flow, field)?;
    if let Some(fcf) = stmt.free_cash_flow {
        return Ok(fcf);
    }
    match (stmt.operating_cash_flow, stmt.capital_expenditure) {
        (Some(ocf), Some(capex)) => Ok(ocf - capex.abs()),
        _ => Err(ValuationError::unavailable(
            field.as_str(),
            "free cash flow components not found",
        )),
    }
}

fn shares_outstanding(
    reported: ValuationResult<Decimal>,
    income: &ValuationResult<IncomeStatement>,
) -> ValuationResult<Decimal> {
    let field = SnapshotField::SharesOutstanding;
    match reported {
        Ok(shares) if shares > Decimal::ZERO => Ok(shares),
        reported => {
            if let Err(e) = &reported {
                debug!(error = %e, "share count unavailable, trying diluted weighted average");
            }
            required(
                statement(income, field)?.weighted_average_shares_diluted,
                field,
                "diluted weighted average shares",
            )
        }
    }
}

/// Cash and equivalents, falling back to cash and short-term investments.
fn cash(balance: &ValuationResult<BalanceSheet>) -> ValuationResult<Money> {
    let field = SnapshotField::Cash;
    let stmt = statement(balance, field)?;
    match (stmt.cash_and_cash_equivalents, stmt.cash_and_short_term_investments) {
        (Some(c), _) if !c.is_zero() => Ok(c),
        (_, Some(c)) => Ok(c),
        (Some(c), None) => Ok(c),
        (None, None) => Err(ValuationError::unavailable(field.as_str(), "cash not reported")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::statements::CompanyStatements;
    use crate::provider::StaticSource;
    use rust_decimal_macros::dec;

    fn full_statements() -> CompanyStatements {
        CompanyStatements {
            profile: Some(CompanyProfile {
                market_cap: Some(dec!(500000000000)),
                beta: Some(dec!(0.6)),
            }),
            income_statement: Some(IncomeStatement {
                income_tax_expense: Some(dec!(-5000000000)),
                income_before_tax: Some(dec!(25000000000)),
                interest_expense: Some(dec!(3500000000)),
                weighted_average_shares_diluted: Some(dec!(930000000)),
            }),
            balance_sheet: Some(BalanceSheet {
                total_debt: Some(dec!(70000000000)),
                cash_and_cash_equivalents: Some(dec!(25000000000)),
                cash_and_short_term_investments: Some(dec!(30000000000)),
            }),
            cash_flow: Some(CashFlowStatement {
                free_cash_flow: Some(dec!(20000000000)),
                operating_cash_flow: Some(dec!(24000000000)),
                capital_expenditure: Some(dec!(-3500000000)),
            }),
            shares_outstanding: Some(dec!(920000000)),
        }
    }

    fn adapter_for(statements: CompanyStatements) -> SnapshotAdapter<StaticSource> {
        SnapshotAdapter::new(StaticSource::new().with_company("UNH", statements))
    }

    #[test]
    fn test_full_snapshot() {
        let snapshot = adapter_for(full_statements()).fetch("unh");

        assert_eq!(snapshot.ticker, "UNH");
        assert_eq!(snapshot.equity, dec!(500000000000));
        assert_eq!(snapshot.debt, dec!(70000000000));
        assert_eq!(snapshot.beta, dec!(0.6));
        // |-5bn| / 25bn = 0.2
        assert_eq!(snapshot.tax_rate, dec!(0.2));
        // 3.5bn / 70bn = 0.05
        assert_eq!(snapshot.cost_of_debt, dec!(0.05));
        assert_eq!(snapshot.free_cash_flow, dec!(20000000000));
        assert_eq!(snapshot.shares_outstanding, dec!(920000000));
        assert_eq!(snapshot.cash, dec!(25000000000));
        assert!(snapshot.unavailable.is_empty());
    }

    #[test]
    fn test_unknown_ticker_degrades_every_field() {
        let snapshot = adapter_for(full_statements()).fetch("NOPE");

        assert_eq!(snapshot.ticker, "NOPE");
        assert_eq!(snapshot, {
            let mut expected = FinancialSnapshot::new("NOPE");
            expected.unavailable = SnapshotField::ALL.to_vec();
            expected
        });
    }

    #[test]
    fn test_missing_balance_sheet_only_affects_dependent_fields() {
        let mut statements = full_statements();
        statements.balance_sheet = None;
        let snapshot = adapter_for(statements).fetch("UNH");

        assert!(snapshot.debt.is_zero());
        assert!(snapshot.cash.is_zero());
        assert!(snapshot.cost_of_debt.is_zero());
        assert_eq!(
            snapshot.unavailable,
            vec![SnapshotField::Debt, SnapshotField::CostOfDebt, SnapshotField::Cash]
        );
        // Independent fields survive
        assert_eq!(snapshot.equity, dec!(500000000000));
        assert_eq!(snapshot.tax_rate, dec!(0.2));
    }

    #[test]
    fn test_tax_rate_zero_pretax_income() {
        let mut statements = full_statements();
        statements.income_statement.as_mut().unwrap().income_before_tax = Some(Decimal::ZERO);
        let snapshot = adapter_for(statements).fetch("UNH");

        assert!(snapshot.tax_rate.is_zero());
        assert!(!snapshot.is_available(SnapshotField::TaxRate));
    }

    #[test]
    fn test_tax_rate_clamped_to_one() {
        let mut statements = full_statements();
        let income = statements.income_statement.as_mut().unwrap();
        income.income_tax_expense = Some(dec!(30));
        income.income_before_tax = Some(dec!(20));
        let snapshot = adapter_for(statements).fetch("UNH");

        assert_eq!(snapshot.tax_rate, Decimal::ONE);
    }

    #[test]
    fn test_cost_of_debt_zero_interest() {
        let mut statements = full_statements();
        statements.income_statement.as_mut().unwrap().interest_expense = Some(Decimal::ZERO);
        let snapshot = adapter_for(statements).fetch("UNH");

        assert!(snapshot.cost_of_debt.is_zero());
        assert!(!snapshot.is_available(SnapshotField::CostOfDebt));
    }

    #[test]
    fn test_cost_of_debt_negative_interest_uses_magnitude() {
        let mut statements = full_statements();
        statements.income_statement.as_mut().unwrap().interest_expense = Some(dec!(-7000000000));
        let snapshot = adapter_for(statements).fetch("UNH");

        assert_eq!(snapshot.cost_of_debt, dec!(0.1));
    }

    #[test]
    fn test_tiny_denominators_degrade_instead_of_overflowing() {
        let mut statements = full_statements();
        let income = statements.income_statement.as_mut().unwrap();
        income.income_tax_expense = Some(dec!(5000000000));
        income.income_before_tax = Some(dec!(0.0000000000000000000000001));
        statements.balance_sheet.as_mut().unwrap().total_debt =
            Some(dec!(0.0000000000000000000000001));
        let snapshot = adapter_for(statements).fetch("UNH");

        assert!(snapshot.tax_rate.is_zero());
        assert!(snapshot.cost_of_debt.is_zero());
        assert_eq!(
            snapshot.unavailable,
            vec![SnapshotField::TaxRate, SnapshotField::CostOfDebt]
        );
        // The tiny debt itself is still reported
        assert_eq!(snapshot.debt, dec!(0.0000000000000000000000001));
        assert_eq!(snapshot.equity, dec!(500000000000));
    }

    #[test]
    fn test_fcf_from_components() {
        let mut statements = full_statements();
        statements.cash_flow.as_mut().unwrap().free_cash_flow = None;
        let snapshot = adapter_for(statements).fetch("UNH");

        // 24bn - |-3.5bn| = 20.5bn
        assert_eq!(snapshot.free_cash_flow, dec!(20500000000));
    }

    #[test]
    fn test_fcf_components_missing() {
        let mut statements = full_statements();
        statements.cash_flow = Some(CashFlowStatement {
            free_cash_flow: None,
            operating_cash_flow: Some(dec!(100)),
            capital_expenditure: None,
        });
        let snapshot = adapter_for(statements).fetch("UNH");

        assert!(snapshot.free_cash_flow.is_zero());
        assert_eq!(snapshot.unavailable, vec![SnapshotField::FreeCashFlow]);
    }

    #[test]
    fn test_negative_fcf_is_kept() {
        let mut statements = full_statements();
        statements.cash_flow.as_mut().unwrap().free_cash_flow = Some(dec!(-1000));
        let snapshot = adapter_for(statements).fetch("UNH");

        assert_eq!(snapshot.free_cash_flow, dec!(-1000));
    }

    #[test]
    fn test_shares_fall_back_to_diluted_weighted_average() {
        let mut statements = full_statements();
        statements.shares_outstanding = None;
        let snapshot = adapter_for(statements).fetch("UNH");

        assert_eq!(snapshot.shares_outstanding, dec!(930000000));
        assert!(snapshot.is_available(SnapshotField::SharesOutstanding));
    }

    #[test]
    fn test_cash_fallback_paths() {
        let mut statements = full_statements();
        statements.balance_sheet.as_mut().unwrap().cash_and_cash_equivalents = Some(Decimal::ZERO);
        let snapshot = adapter_for(statements.clone()).fetch("UNH");
        assert_eq!(snapshot.cash, dec!(30000000000));

        let balance = statements.balance_sheet.as_mut().unwrap();
        balance.cash_and_cash_equivalents = None;
        balance.cash_and_short_term_investments = None;
        let snapshot = adapter_for(statements).fetch("UNH");
        assert!(snapshot.cash.is_zero());
        assert!(!snapshot.is_available(SnapshotField::Cash));
    }
}
