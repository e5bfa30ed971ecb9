use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::provider::FinancialSnapshot;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

use super::wacc::{calculate_wacc, CapmAssumptions};

/// Length of the explicit forecast period in years.
pub const PROJECTION_YEARS: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Fully resolved inputs for a single DCF run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// Most recent free cash flow (year 0)
    pub last_fcf: Money,
    /// FCF growth rate for the explicit forecast period
    pub growth_rate: Rate,
    /// Perpetuity growth rate after the forecast period
    pub terminal_growth: Rate,
    /// Discount rate; must lie strictly between 0 and 1
    pub discount_rate: Rate,
}

/// User-supplied parameters for one valuation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationParameters {
    pub growth_rate: Rate,
    pub terminal_growth: Rate,
    /// If omitted, the snapshot's WACC is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Substitutes the fetched free cash flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fcf_override: Option<Money>,
}

impl Default for ValuationParameters {
    fn default() -> Self {
        Self {
            growth_rate: dec!(0.09),
            terminal_growth: dec!(0.025),
            discount_rate: None,
            last_fcf_override: None,
        }
    }
}

/// Projection for a single year of the explicit forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfYearProjection {
    pub year: u32,
    pub fcf: Money,
    pub discount_factor: Rate,
    pub pv_fcf: Money,
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfOutput {
    /// Year-by-year projections (empty when FCF is zero)
    pub projections: Vec<DcfYearProjection>,
    /// FCF in the final explicit year
    pub terminal_fcf: Money,
    /// Gordon growth terminal value at the end of the forecast
    pub terminal_value: Money,
    /// Sum of present values of explicit-period FCFs
    pub pv_of_fcf: Money,
    /// Present value of terminal value
    pub pv_of_terminal: Money,
    /// Enterprise value = PV(FCFs) + PV(TV)
    pub enterprise_value: Money,
    /// Terminal value as a share of enterprise value
    pub terminal_value_pct: Rate,
    /// Discount rate used in the calculation
    pub discount_rate_used: Rate,
}

impl DcfOutput {
    fn degenerate(discount_rate: Rate) -> Self {
        Self {
            projections: Vec::new(),
            terminal_fcf: Decimal::ZERO,
            terminal_value: Decimal::ZERO,
            pv_of_fcf: Decimal::ZERO,
            pv_of_terminal: Decimal::ZERO,
            enterprise_value: Decimal::ZERO,
            terminal_value_pct: Decimal::ZERO,
            discount_rate_used: discount_rate,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a 2-stage FCF DCF: five explicit years at `growth_rate`, then a
/// Gordon growth terminal value at `terminal_growth`.
///
/// A zero `last_fcf` is a valid degenerate case and yields an enterprise
/// value of exactly zero.
pub fn calculate_dcf(input: &DcfInput) -> ValuationResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_discount_rate(input.discount_rate, "discount_rate")?;
    if input.growth_rate <= dec!(-1) {
        return Err(ValuationError::invalid(
            "growth_rate",
            "Growth rate must be greater than -100%",
        ));
    }

    let output = if input.last_fcf.is_zero() {
        warnings.push("Free cash flow is zero; enterprise value is 0".into());
        DcfOutput::degenerate(input.discount_rate)
    } else {
        project(input, &mut warnings)?
    };

    if input.last_fcf < Decimal::ZERO {
        warnings.push(format!(
            "Negative base free cash flow ({}) projects a negative enterprise value",
            input.last_fcf
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "5-Year FCF DCF with Gordon Growth Terminal Value",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Resolve a DCF from a snapshot and request parameters.
///
/// The discount rate comes from `params` when supplied, otherwise from the
/// snapshot's WACC. The FCF override, when present, replaces the snapshot's
/// free cash flow.
pub fn dcf_from_snapshot(
    snapshot: &FinancialSnapshot,
    params: &ValuationParameters,
    assumptions: &CapmAssumptions,
) -> ValuationResult<ComputationOutput<DcfOutput>> {
    let mut wacc_warnings = Vec::new();
    let discount_rate = resolve_discount_rate(snapshot, params, assumptions, &mut wacc_warnings)?;

    let input = DcfInput {
        last_fcf: params.last_fcf_override.unwrap_or(snapshot.free_cash_flow),
        growth_rate: params.growth_rate,
        terminal_growth: params.terminal_growth,
        discount_rate,
    };

    let mut output = calculate_dcf(&input)?;
    wacc_warnings.append(&mut output.warnings);
    output.warnings = wacc_warnings;
    Ok(output)
}

/// Validate a supplied discount rate, or fall back to the snapshot's WACC.
pub fn resolve_discount_rate(
    snapshot: &FinancialSnapshot,
    params: &ValuationParameters,
    assumptions: &CapmAssumptions,
    warnings: &mut Vec<String>,
) -> ValuationResult<Rate> {
    match params.discount_rate {
        Some(rate) => {
            validate_discount_rate(rate, "discount_rate")?;
            Ok(rate)
        }
        None => {
            let wacc_out = calculate_wacc(snapshot, assumptions)?;
            for w in &wacc_out.warnings {
                warnings.push(format!("[WACC] {w}"));
            }
            validate_discount_rate(wacc_out.result.wacc, "wacc")?;
            Ok(wacc_out.result.wacc)
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn validate_discount_rate(rate: Rate, field: &str) -> ValuationResult<()> {
    if rate <= Decimal::ZERO || rate >= Decimal::ONE {
        return Err(ValuationError::invalid(
            field,
            format!("Discount rate must be between 0 and 1 (exclusive), got {rate}"),
        ));
    }
    Ok(())
}

fn project(input: &DcfInput, warnings: &mut Vec<String>) -> ValuationResult<DcfOutput> {
    let one_plus_g = checked(
        Decimal::ONE.checked_add(input.growth_rate),
        "growth factor (1 + growth_rate)",
    )?;
    // 0 < r < 1, so the compound factor stays below 2^5
    let one_plus_r = Decimal::ONE + input.discount_rate;

    let mut projections = Vec::with_capacity(PROJECTION_YEARS as usize);
    let mut growth = Decimal::ONE;
    let mut compound = Decimal::ONE;

    for year in 1..=PROJECTION_YEARS {
        growth = checked(growth.checked_mul(one_plus_g), "compounded FCF growth")?;
        compound *= one_plus_r;

        let fcf = checked(
            input.last_fcf.checked_mul(growth),
            "projected free cash flow",
        )?;
        let pv_fcf = fcf / compound;
        projections.push(DcfYearProjection {
            year,
            fcf,
            discount_factor: Decimal::ONE / compound,
            pv_fcf,
        });
    }

    let pv_of_fcf = projections
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.pv_fcf));
    let pv_of_fcf: Money = checked(pv_of_fcf, "sum of discounted FCFs")?;

    // --- Terminal value (Gordon growth) ---
    let spread = input.discount_rate - input.terminal_growth;
    if spread <= Decimal::ZERO {
        return Err(ValuationError::invalid(
            "terminal_growth",
            format!(
                "Terminal growth ({}) must be strictly less than discount rate ({})",
                input.terminal_growth, input.discount_rate
            ),
        ));
    }
    let terminal_fcf = checked(input.last_fcf.checked_mul(growth), "terminal FCF")?;
    let terminal_value = checked(
        Decimal::ONE
            .checked_add(input.terminal_growth)
            .and_then(|f| terminal_fcf.checked_mul(f))
            .and_then(|n| n.checked_div(spread)),
        "terminal value (discount rate - terminal growth too small)",
    )?;
    let pv_of_terminal = terminal_value / compound;

    let enterprise_value = checked(
        pv_of_fcf.checked_add(pv_of_terminal),
        "enterprise value",
    )?;

    let terminal_value_pct = pv_of_terminal
        .checked_div(enterprise_value)
        .unwrap_or(Decimal::ZERO);
    if terminal_value_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value",
            terminal_value_pct.saturating_mul(dec!(100))
        ));
    }

    Ok(DcfOutput {
        projections,
        terminal_fcf,
        terminal_value,
        pv_of_fcf,
        pv_of_terminal,
        enterprise_value,
        terminal_value_pct,
        discount_rate_used: input.discount_rate,
    })
}

fn checked(value: Option<Decimal>, context: &str) -> ValuationResult<Decimal> {
    value.ok_or_else(|| ValuationError::overflow(context))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
