use tabled::{builder::Builder, Table};

use intrinsic_core::valuation::{DiscountRateSource, FcfSource, SensitivityGrid, ValuationOutput};

use super::format::{format_currency, format_optional_currency, format_percent};

const NOT_AVAILABLE: &str = "not available";

/// Intrinsic value per share across terminal growth (rows) and WACC
/// (columns). Invalid or non-computable cells print as `n/a`.
pub fn render_grid(grid: &SensitivityGrid) -> String {
    let mut builder = Builder::default();

    let mut header = vec![String::new()];
    header.extend(
        grid.discount_rate_values
            .iter()
            .map(|r| format!("WACC={}", format_percent(*r))),
    );
    builder.push_record(header);

    for (i, tg) in grid.terminal_growth_values.iter().enumerate() {
        let mut row = vec![format!("g={}", format_percent(*tg))];
        row.extend(
            (0..grid.discount_rate_values.len())
                .map(|j| format_optional_currency(grid.intrinsic_value(i, j), "n/a")),
        );
        builder.push_record(row);
    }

    Table::from(builder).to_string()
}

/// Headline figures followed by the sensitivity grid.
pub fn render_valuation(valuation: &ValuationOutput) -> String {
    let discount_label = match valuation.discount_rate_source {
        DiscountRateSource::Wacc => "computed WACC",
        DiscountRateSource::Supplied => "supplied",
    };
    let fcf_label = match valuation.fcf_source {
        FcfSource::Reported => "reported",
        FcfSource::Override => "override",
    };

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    builder.push_record(["Ticker".to_string(), valuation.ticker.clone()]);
    builder.push_record([
        "Base free cash flow".to_string(),
        format!("{} ({fcf_label})", format_currency(valuation.last_fcf)),
    ]);
    builder.push_record([
        "Discount rate".to_string(),
        format!("{} ({discount_label})", format_percent(valuation.discount_rate)),
    ]);
    builder.push_record([
        "Growth rate".to_string(),
        format_percent(valuation.growth_rate),
    ]);
    builder.push_record([
        "Terminal growth".to_string(),
        format_percent(valuation.terminal_growth),
    ]);
    builder.push_record([
        "Enterprise value".to_string(),
        format_currency(valuation.enterprise_value),
    ]);
    builder.push_record(["Net debt".to_string(), format_currency(valuation.net_debt)]);
    builder.push_record([
        "Intrinsic value per share".to_string(),
        format_optional_currency(valuation.intrinsic_value_per_share, NOT_AVAILABLE),
    ]);

    format!(
        "{}\n\nSensitivity (intrinsic value per share)\n{}",
        Table::from(builder),
        render_grid(&valuation.sensitivity)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrinsic_core::valuation::{
        value_company, CapmAssumptions, SensitivityInput, ValuationParameters,
    };
    use intrinsic_core::FinancialSnapshot;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            ticker: "ACME".into(),
            equity: dec!(30000000000),
            debt: dec!(2500000000),
            beta: dec!(1.1),
            tax_rate: dec!(0.21),
            cost_of_debt: dec!(0.055),
            free_cash_flow: dec!(1000000000),
            shares_outstanding: dec!(100000000),
            cash: dec!(500000000),
            unavailable: vec![],
        }
    }

    #[test]
    fn test_grid_labels() {
        let grid = intrinsic_core::valuation::sensitivity_grid(&SensitivityInput {
            last_fcf: dec!(1000000000),
            growth_rate: dec!(0.05),
            base_terminal_growth: dec!(0.02),
            base_discount_rate: dec!(0.095),
            net_debt: Decimal::ZERO,
            shares_outstanding: dec!(100000000),
        })
        .unwrap()
        .result;
        let rendered = render_grid(&grid);

        for label in ["WACC=8.50%", "WACC=9.50%", "WACC=10.50%", "g=1.00%", "g=2.00%", "g=3.00%"] {
            assert!(rendered.contains(label), "missing {label} in\n{rendered}");
        }
        assert!(!rendered.contains("n/a"));
    }

    #[test]
    fn test_grid_marks_invalid_cells() {
        let grid = intrinsic_core::valuation::sensitivity_grid(&SensitivityInput {
            last_fcf: dec!(1000000000),
            growth_rate: dec!(0.05),
            base_terminal_growth: dec!(0.08),
            base_discount_rate: dec!(0.08),
            net_debt: Decimal::ZERO,
            shares_outstanding: dec!(100000000),
        })
        .unwrap()
        .result;
        assert!(render_grid(&grid).contains("n/a"));
    }

    #[test]
    fn test_valuation_summary() {
        let params = ValuationParameters {
            discount_rate: Some(dec!(0.095)),
            ..ValuationParameters::default()
        };
        let out = value_company(&snapshot(), &params, &CapmAssumptions::default())
            .unwrap()
            .result;
        let rendered = render_valuation(&out);

        assert!(rendered.contains("$19,243,506,931.92"));
        assert!(rendered.contains("$172.44"));
        assert!(rendered.contains("9.50% (supplied)"));
        assert!(rendered.contains("g=2.50%"));
    }

    #[test]
    fn test_valuation_summary_without_shares() {
        let mut snapshot = snapshot();
        snapshot.shares_outstanding = Decimal::ZERO;
        let params = ValuationParameters {
            discount_rate: Some(dec!(0.095)),
            ..ValuationParameters::default()
        };
        let out = value_company(&snapshot, &params, &CapmAssumptions::default())
            .unwrap()
            .result;
        let rendered = render_valuation(&out);

        assert!(rendered.contains("not available"));
        assert!(rendered.contains("n/a"));
    }
}
