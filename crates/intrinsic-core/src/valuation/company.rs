use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::provider::{FinancialSnapshot, SnapshotField};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

use super::dcf::{
    calculate_dcf, validate_discount_rate, DcfInput, DcfOutput, ValuationParameters,
};
use super::intrinsic::{equity_value, intrinsic_value_per_share};
use super::sensitivity::{sensitivity_grid, SensitivityGrid, SensitivityInput};
use super::wacc::{calculate_wacc, CapmAssumptions, WaccOutput};

/// Where the base free cash flow came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FcfSource {
    Reported,
    Override,
}

/// Where the discount rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRateSource {
    Supplied,
    Wacc,
}

/// Full single-company valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationOutput {
    pub ticker: String,
    pub last_fcf: Money,
    pub fcf_source: FcfSource,
    pub discount_rate: Rate,
    pub discount_rate_source: DiscountRateSource,
    /// Present only when the discount rate was derived from WACC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc: Option<WaccOutput>,
    pub growth_rate: Rate,
    pub terminal_growth: Rate,
    pub dcf: DcfOutput,
    pub enterprise_value: Money,
    /// debt - cash
    pub net_debt: Money,
    pub equity_value: Money,
    pub shares_outstanding: Decimal,
    /// `None` when shares outstanding is not available
    pub intrinsic_value_per_share: Option<Money>,
    pub sensitivity: SensitivityGrid,
}

/// Value one company from its snapshot.
///
/// The discount rate is `params.discount_rate` when supplied, otherwise the
/// snapshot's WACC (a zero capital structure then fails with
/// `DivisionByZero`). The FCF override replaces the reported FCF. The
/// sensitivity grid is centred on the resolved terminal growth and discount
/// rate, so its middle cell matches the headline intrinsic value.
pub fn value_company(
    snapshot: &FinancialSnapshot,
    params: &ValuationParameters,
    assumptions: &CapmAssumptions,
) -> ValuationResult<ComputationOutput<ValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Discount rate ---
    let (discount_rate, discount_rate_source, wacc) = match params.discount_rate {
        Some(rate) => (rate, DiscountRateSource::Supplied, None),
        None => {
            let wacc_out = calculate_wacc(snapshot, assumptions)?;
            warnings.extend(wacc_out.warnings.iter().map(|w| format!("[WACC] {w}")));
            let wacc = wacc_out.result;
            validate_discount_rate(wacc.wacc, "wacc")?;
            (wacc.wacc, DiscountRateSource::Wacc, Some(wacc))
        }
    };

    // --- Free cash flow ---
    let (last_fcf, fcf_source) = match params.last_fcf_override {
        Some(fcf) => (fcf, FcfSource::Override),
        None => {
            if !snapshot.is_available(SnapshotField::FreeCashFlow) {
                warnings.push(format!(
                    "free_cash_flow unavailable for {}; defaulted to 0",
                    snapshot.ticker
                ));
            }
            (snapshot.free_cash_flow, FcfSource::Reported)
        }
    };

    let dcf_out = calculate_dcf(&DcfInput {
        last_fcf,
        growth_rate: params.growth_rate,
        terminal_growth: params.terminal_growth,
        discount_rate,
    })?;
    warnings.extend(dcf_out.warnings);
    let dcf = dcf_out.result;

    // --- Intrinsic value ---
    let net_debt = snapshot.net_debt();
    for field in [SnapshotField::Debt, SnapshotField::Cash] {
        if !snapshot.is_available(field) {
            warnings.push(format!(
                "{field} unavailable for {}; net debt assumes 0",
                snapshot.ticker
            ));
        }
    }
    let enterprise_value = dcf.enterprise_value;
    let equity = equity_value(enterprise_value, net_debt)
        .ok_or_else(|| ValuationError::overflow("equity value (enterprise value - net debt)"))?;
    let intrinsic = intrinsic_value_per_share(
        enterprise_value,
        net_debt,
        snapshot.shares_outstanding,
    );
    if intrinsic.is_none() {
        warnings.push(if snapshot.shares_outstanding > Decimal::ZERO {
            format!(
                "Intrinsic value per share for {} overflows at {} shares outstanding",
                snapshot.ticker, snapshot.shares_outstanding
            )
        } else {
            format!(
                "Shares outstanding not available for {}; intrinsic value per share not computable",
                snapshot.ticker
            )
        });
    }

    // --- Sensitivity ---
    let grid_out = sensitivity_grid(&SensitivityInput {
        last_fcf,
        growth_rate: params.growth_rate,
        base_terminal_growth: params.terminal_growth,
        base_discount_rate: discount_rate,
        net_debt,
        shares_outstanding: snapshot.shares_outstanding,
    })?;
    warnings.extend(
        grid_out
            .warnings
            .into_iter()
            .filter(|w| !w.starts_with("Shares outstanding"))
            .map(|w| format!("[Sensitivity] {w}")),
    );

    let output = ValuationOutput {
        ticker: snapshot.ticker.clone(),
        last_fcf,
        fcf_source,
        discount_rate,
        discount_rate_source,
        wacc,
        growth_rate: params.growth_rate,
        terminal_growth: params.terminal_growth,
        enterprise_value,
        net_debt,
        equity_value: equity,
        shares_outstanding: snapshot.shares_outstanding,
        intrinsic_value_per_share: intrinsic,
        sensitivity: grid_out.result,
        dcf,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Single-company DCF valuation with 3x3 sensitivity",
        &serde_json::json!({
            "ticker": snapshot.ticker,
            "params": params,
            "risk_free_rate": assumptions.risk_free_rate,
            "market_return": assumptions.market_return,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
