use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::provider::{FinancialSnapshot, SnapshotField};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

/// Default risk-free rate (10-year UST)
pub const DEFAULT_RISK_FREE_RATE: Rate = dec!(0.043);

/// Default expected market return
pub const DEFAULT_MARKET_RETURN: Rate = dec!(0.0932);

/// Market assumptions feeding CAPM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapmAssumptions {
    pub risk_free_rate: Rate,
    pub market_return: Rate,
}

impl Default for CapmAssumptions {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            market_return: DEFAULT_MARKET_RETURN,
        }
    }
}

impl CapmAssumptions {
    /// Market risk premium: R_m - R_f
    pub fn market_risk_premium(&self) -> Rate {
        self.market_return.saturating_sub(self.risk_free_rate)
    }
}

/// Output of the WACC calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccOutput {
    /// Weighted average cost of capital
    pub wacc: Rate,
    /// Cost of equity via CAPM
    pub cost_of_equity: Rate,
    /// After-tax cost of debt
    pub after_tax_cost_of_debt: Rate,
    /// Pre-tax cost of debt (echoed back)
    pub cost_of_debt_pretax: Rate,
    /// E / (D + E)
    pub equity_weight: Rate,
    /// D / (D + E)
    pub debt_weight: Rate,
    pub beta: Decimal,
    pub tax_rate: Rate,
}

/// Expected equity return under CAPM.
///
/// R_e = R_f + beta * (R_m - R_f). Any beta is accepted, including negative.
/// Saturates at the `Decimal` bounds; such a rate never passes discount-rate
/// validation.
pub fn capm(beta: Decimal, assumptions: &CapmAssumptions) -> Rate {
    beta.saturating_mul(assumptions.market_risk_premium())
        .saturating_add(assumptions.risk_free_rate)
}

/// Calculate the Weighted Average Cost of Capital for a snapshot.
///
/// WACC = E/(D+E) * R_e + D/(D+E) * R_d * (1 - t)
///
/// A zero capital structure (D + E = 0) is reported as `DivisionByZero`
/// rather than producing a NaN-like result.
pub fn calculate_wacc(
    snapshot: &FinancialSnapshot,
    assumptions: &CapmAssumptions,
) -> ValuationResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (equity_weight, debt_weight) = capital_weights(snapshot.equity, snapshot.debt)?;

    let cost_of_equity = capm(snapshot.beta, assumptions);
    let after_tax_cost_of_debt = snapshot
        .cost_of_debt
        .checked_mul(Decimal::ONE - snapshot.tax_rate)
        .ok_or_else(|| ValuationError::overflow("after-tax cost of debt"))?;
    let wacc = equity_weight
        .checked_mul(cost_of_equity)
        .zip(debt_weight.checked_mul(after_tax_cost_of_debt))
        .and_then(|(e, d)| e.checked_add(d))
        .ok_or_else(|| ValuationError::overflow("WACC weighted sum"))?;

    // --- Degraded inputs ---
    for field in [
        SnapshotField::Equity,
        SnapshotField::Debt,
        SnapshotField::Beta,
        SnapshotField::TaxRate,
        SnapshotField::CostOfDebt,
    ] {
        if !snapshot.is_available(field) {
            warnings.push(format!("{field} unavailable for {}; defaulted to 0", snapshot.ticker));
        }
    }

    // --- Reasonableness warnings ---
    if snapshot.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): verify market data; betas above 3.0 are unusual",
            snapshot.beta
        ));
    }
    if wacc <= Decimal::ZERO {
        warnings.push(format!(
            "WACC of {wacc} is not positive and cannot be used as a discount rate"
        ));
    } else if wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {wacc} exceeds 20%; appropriate for high-risk situations only"
        ));
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
        cost_of_debt_pretax: snapshot.cost_of_debt,
        equity_weight,
        debt_weight,
        beta: snapshot.beta,
        tax_rate: snapshot.tax_rate,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "WACC via CAPM (market-value weights)",
        &serde_json::json!({
            "ticker": snapshot.ticker,
            "equity": snapshot.equity,
            "debt": snapshot.debt,
            "risk_free_rate": assumptions.risk_free_rate,
            "market_return": assumptions.market_return,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Returns (equity_weight, debt_weight).
fn capital_weights(equity: Money, debt: Money) -> ValuationResult<(Rate, Rate)> {
    let capital = equity
        .checked_add(debt)
        .ok_or_else(|| ValuationError::overflow("WACC capital structure (debt + equity)"))?;
    if capital.is_zero() {
        return Err(ValuationError::DivisionByZero {
            context: "WACC capital structure (debt + equity = 0)".into(),
        });
    }
    if capital < Decimal::ZERO {
        return Err(ValuationError::invalid(
            "debt + equity",
            format!("Total capital must be positive, got {capital}"),
        ));
    }
    equity
        .checked_div(capital)
        .zip(debt.checked_div(capital))
        .ok_or_else(|| ValuationError::overflow("WACC capital weights"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
