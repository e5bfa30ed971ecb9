use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ValuationResult;

use super::dcf::{calculate_dcf, DcfInput};
use super::intrinsic::intrinsic_value_per_share;

/// Points per axis
pub const GRID_POINTS: usize = 3;

/// Half-width of each axis around the base value
pub const GRID_SPAN: Rate = dec!(0.01);

/// Axis values are rounded to this many decimal places
const AXIS_DECIMALS: u32 = 4;

/// Input for the terminal-growth x discount-rate sensitivity grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub last_fcf: Money,
    /// Held fixed across the grid
    pub growth_rate: Rate,
    /// Centre of the row axis
    pub base_terminal_growth: Rate,
    /// Centre of the column axis
    pub base_discount_rate: Rate,
    /// Held fixed across the grid
    pub net_debt: Money,
    pub shares_outstanding: Decimal,
}

/// Output of the sensitivity grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    /// Row axis. Outer points are rounded to 4 decimals; the centre is the
    /// exact base terminal growth.
    pub terminal_growth_values: Vec<Rate>,
    /// Column axis. Outer points are rounded to 4 decimals; the centre is the
    /// exact base discount rate, which may carry more decimals when it is a
    /// computed WACC.
    pub discount_rate_values: Vec<Rate>,
    /// enterprise_values[i][j] at terminal_growth_values[i], discount_rate_values[j]
    pub enterprise_values: Vec<Vec<Option<Money>>>,
    /// intrinsic_values[i][j]; `None` where the cell is invalid or not computable
    pub intrinsic_values: Vec<Vec<Option<Money>>>,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
    pub base_case_value: Option<Money>,
}

impl SensitivityGrid {
    pub fn intrinsic_value(&self, row: usize, col: usize) -> Option<Money> {
        self.intrinsic_values.get(row)?.get(col).copied().flatten()
    }
}

/// `n` evenly spaced values from `start` to `end`, endpoints included.
pub fn linspace(start: Decimal, end: Decimal, n: usize) -> Vec<Decimal> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / Decimal::from(n - 1);
            (0..n)
                .map(|i| {
                    if i == n - 1 {
                        end
                    } else {
                        start + step * Decimal::from(i)
                    }
                })
                .collect()
        }
    }
}

/// Three points centred on `base`, +/- 0.01. The outer points are rounded
/// to 4 decimals; the centre stays exactly `base` so the middle cell
/// reproduces the single-point valuation.
pub fn grid_axis(base: Rate) -> Vec<Rate> {
    let mid = GRID_POINTS / 2;
    linspace(base - GRID_SPAN, base + GRID_SPAN, GRID_POINTS)
        .into_iter()
        .enumerate()
        .map(|(i, v)| if i == mid { base } else { v.round_dp(AXIS_DECIMALS) })
        .collect()
}

/// Recompute DCF and intrinsic value per share at every combination of
/// terminal growth (rows) and discount rate (columns).
///
/// A cell whose parameters are invalid (terminal growth not below the
/// discount rate, or a discount rate outside (0, 1)) or whose value
/// overflows is `None` and produces a warning; it does not abort the grid.
pub fn sensitivity_grid(
    input: &SensitivityInput,
) -> ValuationResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let tg_values = grid_axis(input.base_terminal_growth);
    let rate_values = grid_axis(input.base_discount_rate);

    let mut enterprise_values = Vec::with_capacity(tg_values.len());
    let mut intrinsic_values = Vec::with_capacity(tg_values.len());

    for tg in &tg_values {
        let mut ev_row = Vec::with_capacity(rate_values.len());
        let mut iv_row = Vec::with_capacity(rate_values.len());
        for rate in &rate_values {
            let cell = calculate_dcf(&DcfInput {
                last_fcf: input.last_fcf,
                growth_rate: input.growth_rate,
                terminal_growth: *tg,
                discount_rate: *rate,
            });
            match cell {
                Ok(out) => {
                    let ev = out.result.enterprise_value;
                    ev_row.push(Some(ev));
                    iv_row.push(intrinsic_value_per_share(
                        ev,
                        input.net_debt,
                        input.shares_outstanding,
                    ));
                }
                Err(e) => {
                    warnings.push(format!("Evaluation failed at (g={tg}, r={rate}): {e}"));
                    ev_row.push(None);
                    iv_row.push(None);
                }
            }
        }
        enterprise_values.push(ev_row);
        intrinsic_values.push(iv_row);
    }

    if input.shares_outstanding <= Decimal::ZERO {
        warnings.push("Shares outstanding not available; intrinsic values not computable".into());
    }

    let mid = GRID_POINTS / 2;
    let base_case_value = intrinsic_values
        .get(mid)
        .and_then(|row| row.get(mid))
        .copied()
        .flatten();

    let output = SensitivityGrid {
        terminal_growth_values: tg_values,
        discount_rate_values: rate_values,
        enterprise_values,
        intrinsic_values,
        base_case_position: (mid, mid),
        base_case_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Terminal Growth x Discount Rate Sensitivity (3x3)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
