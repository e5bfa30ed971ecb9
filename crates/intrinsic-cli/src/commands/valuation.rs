use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use intrinsic_core::valuation::{
    calculate_dcf, calculate_wacc, value_company, CapmAssumptions, DcfInput, ValuationOutput,
    ValuationParameters,
};
use intrinsic_core::{ComputationOutput, FinancialSnapshot, Rate};

use crate::input;
use crate::input::params::{
    self, DEFAULT_GROWTH_PERCENT, DEFAULT_TERMINAL_GROWTH_PERCENT, FALLBACK_WACC_PERCENT,
};
use crate::output::format::format_percent;

use super::data::build_provider;

/// Arguments for WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Ticker symbol
    pub ticker: String,

    #[command(flatten)]
    pub market: MarketArgs,
}

/// CAPM market assumptions shared by the ticker commands
#[derive(Args, Clone)]
pub struct MarketArgs {
    /// Risk-free rate as a decimal (default 0.043)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Expected market return as a decimal (default 0.0932)
    #[arg(long)]
    pub market_return: Option<Decimal>,
}

impl MarketArgs {
    pub fn assumptions(&self) -> CapmAssumptions {
        let defaults = CapmAssumptions::default();
        CapmAssumptions {
            risk_free_rate: self.risk_free_rate.unwrap_or(defaults.risk_free_rate),
            market_return: self.market_return.unwrap_or(defaults.market_return),
        }
    }
}

/// Arguments for a standalone DCF
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON input file with DCF parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Most recent free cash flow
    #[arg(long)]
    pub fcf: Option<Decimal>,

    /// FCF growth rate for years 1-5 as a decimal
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Terminal growth rate as a decimal
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Discount rate as a decimal
    #[arg(long)]
    pub discount_rate: Option<Decimal>,
}

/// Arguments for a full valuation (percentages, FCF in billions)
#[derive(Args, Clone)]
#[command(allow_hyphen_values = true)]
pub struct ValueArgs {
    /// Ticker symbol
    pub ticker: String,

    /// Override the fetched free cash flow, in billions
    #[arg(long)]
    pub fcf_billions: Option<Decimal>,

    /// Discount rate in percent, 1-20 (default: computed WACC, else 7.5)
    #[arg(long)]
    pub wacc: Option<Decimal>,

    /// FCF growth rate in percent, 0-20
    #[arg(long, default_value_t = DEFAULT_GROWTH_PERCENT)]
    pub growth: Decimal,

    /// Terminal growth rate in percent, 0-10
    #[arg(long, default_value_t = DEFAULT_TERMINAL_GROWTH_PERCENT)]
    pub terminal_growth: Decimal,

    #[command(flatten)]
    pub market: MarketArgs,
}

pub fn run_wacc(args: WaccArgs, data: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let provider = build_provider(data)?;
    let snapshot = provider.fetch(&args.ticker);
    let result = calculate_wacc(&snapshot, &args.market.assumptions())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        DcfInput {
            last_fcf: args.fcf.ok_or("--fcf is required (or provide --input)")?,
            growth_rate: args
                .growth_rate
                .ok_or("--growth-rate is required (or provide --input)")?,
            terminal_growth: args
                .terminal_growth
                .ok_or("--terminal-growth is required (or provide --input)")?,
            discount_rate: args
                .discount_rate
                .ok_or("--discount-rate is required (or provide --input)")?,
        }
    };

    let result = calculate_dcf(&dcf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_value(args: ValueArgs, data: Option<&str>) -> Result<Value, Box<dyn std::error::Error>> {
    let result = value_ticker(&args, data)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(
    args: ValueArgs,
    data: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation = value_ticker(&args, data)?;
    let grid = ComputationOutput {
        result: valuation.result.sensitivity,
        methodology: "Terminal Growth x Discount Rate Sensitivity (3x3)".to_string(),
        assumptions: valuation.assumptions,
        warnings: valuation.warnings,
        metadata: valuation.metadata,
    };
    Ok(serde_json::to_value(grid)?)
}

fn value_ticker(
    args: &ValueArgs,
    data: Option<&str>,
) -> Result<ComputationOutput<ValuationOutput>, Box<dyn std::error::Error>> {
    let provider = build_provider(data)?;
    let snapshot = provider.fetch(&args.ticker);
    let assumptions = args.market.assumptions();

    let wacc_rate = match args.wacc {
        Some(percent) => Some(params::WACC.to_rate(percent)?),
        None => None,
    };
    let fcf = args
        .fcf_billions
        .map(params::fcf_from_billions)
        .transpose()?;

    value_with_inputs(
        &snapshot,
        &assumptions,
        fcf,
        wacc_rate,
        params::GROWTH.to_rate(args.growth)?,
        params::TERMINAL_GROWTH.to_rate(args.terminal_growth)?,
    )
}

/// Run the valuation, falling back to the default discount rate when no
/// rate was entered and the computed WACC is unusable.
pub fn value_with_inputs(
    snapshot: &FinancialSnapshot,
    assumptions: &CapmAssumptions,
    last_fcf_override: Option<Decimal>,
    discount_rate: Option<Rate>,
    growth_rate: Rate,
    terminal_growth: Rate,
) -> Result<ComputationOutput<ValuationOutput>, Box<dyn std::error::Error>> {
    let mut notes = Vec::new();
    let discount_rate = match discount_rate {
        Some(rate) => Some(rate),
        None if usable_wacc(snapshot, assumptions).is_some() => None,
        None => {
            let fallback = params::percent_to_rate(FALLBACK_WACC_PERCENT);
            notes.push(format!(
                "Computed WACC not usable for {}; discount rate defaulted to {}",
                snapshot.ticker,
                format_percent(fallback)
            ));
            Some(fallback)
        }
    };

    let request = ValuationParameters {
        growth_rate,
        terminal_growth,
        discount_rate,
        last_fcf_override,
    };
    let mut output = value_company(snapshot, &request, assumptions)?;
    notes.append(&mut output.warnings);
    output.warnings = notes;
    Ok(output)
}

/// The computed WACC when it exists and lies within the accepted input
/// range; `None` means the caller should use the fallback rate.
pub fn usable_wacc(snapshot: &FinancialSnapshot, assumptions: &CapmAssumptions) -> Option<Rate> {
    match calculate_wacc(snapshot, assumptions) {
        Ok(out) if params::WACC.contains_rate(out.result.wacc) => Some(out.result.wacc),
        Ok(out) => {
            warn!(ticker = %snapshot.ticker, wacc = %out.result.wacc, "computed WACC outside 1-20%");
            None
        }
        Err(e) => {
            warn!(ticker = %snapshot.ticker, error = %e, "WACC not computable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intrinsic_core::valuation::DiscountRateSource;
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
    fn test_usable_wacc() {
        let rate = usable_wacc(&snapshot(), &CapmAssumptions::default()).unwrap();
        assert!((rate - dec!(0.0940069231)).abs() < dec!(0.0000000001));

        let mut empty = snapshot();
        empty.equity = Decimal::ZERO;
        empty.debt = Decimal::ZERO;
        assert_eq!(usable_wacc(&empty, &CapmAssumptions::default()), None);
    }

    #[test]
    fn test_fallback_rate_when_wacc_unusable() {
        let mut snap = snapshot();
        snap.equity = Decimal::ZERO;
        snap.debt = Decimal::ZERO;

        let out = value_with_inputs(
            &snap,
            &CapmAssumptions::default(),
            None,
            None,
            dec!(0.05),
            dec!(0.02),
        )
        .unwrap();
        assert_eq!(out.result.discount_rate, dec!(0.075));
        assert_eq!(out.result.discount_rate_source, DiscountRateSource::Supplied);
        assert!(out.warnings[0].contains("defaulted to 7.50%"));
        // 1bn FCF at 5% / 2% / 7.5%, less 2bn net debt, over 100m shares
        let iv = out.result.intrinsic_value_per_share.unwrap();
        assert!((iv - dec!(191.4879323323)).abs() < dec!(0.0001), "got {iv}");
    }

    #[test]
    fn test_computed_wacc_used_when_usable() {
        let out = value_with_inputs(
            &snapshot(),
            &CapmAssumptions::default(),
            None,
            None,
            dec!(0.09),
            dec!(0.025),
        )
        .unwrap();
        assert_eq!(out.result.discount_rate_source, DiscountRateSource::Wacc);
        assert!(out.result.wacc.is_some());
    }

    #[test]
    fn test_overflowing_rates_are_errors() {
        let result = value_with_inputs(
            &snapshot(),
            &CapmAssumptions::default(),
            None,
            Some(dec!(0.05)),
            dec!(0.05),
            dec!(0.0499999999999999999999999),
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Arithmetic overflow"), "got {err}");
    }

    #[test]
    fn test_market_args_defaults() {
        let market = MarketArgs {
            risk_free_rate: None,
            market_return: Some(dec!(0.1)),
        };
        let assumptions = market.assumptions();
        assert_eq!(assumptions.risk_free_rate, dec!(0.043));
        assert_eq!(assumptions.market_return, dec!(0.1));
    }
}
