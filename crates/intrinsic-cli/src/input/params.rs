//! User-facing parameter ranges. Rates are entered as percentages and
//! FCF overrides in billions; everything is converted to decimals before
//! it reaches the engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use intrinsic_core::{Money, Rate};

const HUNDRED: Decimal = dec!(100);
const BILLION: Decimal = dec!(1000000000);

pub const DEFAULT_GROWTH_PERCENT: Decimal = dec!(5);
pub const DEFAULT_TERMINAL_GROWTH_PERCENT: Decimal = dec!(2);
/// Used when the computed WACC is unavailable or outside [`WACC`]
pub const FALLBACK_WACC_PERCENT: Decimal = dec!(7.5);

/// Inclusive bounds for a percentage input.
#[derive(Debug, Clone, Copy)]
pub struct PercentRange {
    pub label: &'static str,
    pub min: Decimal,
    pub max: Decimal,
}

pub const WACC: PercentRange = PercentRange {
    label: "WACC",
    min: dec!(1),
    max: dec!(20),
};

pub const GROWTH: PercentRange = PercentRange {
    label: "growth rate",
    min: dec!(0),
    max: dec!(20),
};

pub const TERMINAL_GROWTH: PercentRange = PercentRange {
    label: "terminal growth",
    min: dec!(0),
    max: dec!(10),
};

impl PercentRange {
    /// Validate a percentage and convert it to a decimal rate.
    pub fn to_rate(&self, percent: Decimal) -> Result<Rate, String> {
        if percent < self.min || percent > self.max {
            return Err(format!(
                "{} must be between {}% and {}%, got {}%",
                self.label,
                self.min.normalize(),
                self.max.normalize(),
                percent.normalize()
            ));
        }
        Ok(percent / HUNDRED)
    }

    pub fn contains_rate(&self, rate: Rate) -> bool {
        rate.checked_mul(HUNDRED)
            .is_some_and(|percent| percent >= self.min && percent <= self.max)
    }
}

pub fn percent_to_rate(percent: Decimal) -> Rate {
    percent / HUNDRED
}

pub fn rate_to_percent(rate: Rate) -> Decimal {
    rate * HUNDRED
}

pub fn fcf_from_billions(billions: Decimal) -> Result<Money, String> {
    billions
        .checked_mul(BILLION)
        .ok_or_else(|| format!("free cash flow of {billions} billion is too large"))
}

pub fn fcf_to_billions(fcf: Money) -> Decimal {
    fcf / BILLION
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_percent_conversion() {
        assert_eq!(WACC.to_rate(dec!(9.5)).unwrap(), dec!(0.095));
        assert_eq!(GROWTH.to_rate(dec!(0)).unwrap(), Decimal::ZERO);
        assert_eq!(TERMINAL_GROWTH.to_rate(dec!(10)).unwrap(), dec!(0.1));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = WACC.to_rate(dec!(0.5)).unwrap_err();
        assert_eq!(err, "WACC must be between 1% and 20%, got 0.5%");
        assert!(GROWTH.to_rate(dec!(20.1)).is_err());
        assert!(TERMINAL_GROWTH.to_rate(dec!(-1)).is_err());
    }

    #[test]
    fn test_contains_rate() {
        assert!(WACC.contains_rate(dec!(0.094)));
        assert!(WACC.contains_rate(dec!(0.2)));
        assert!(!WACC.contains_rate(dec!(0.0099)));
        assert!(!WACC.contains_rate(dec!(-0.05)));
        assert!(!WACC.contains_rate(Decimal::MAX));
    }

    #[test]
    fn test_huge_fcf_billions_rejected() {
        let err = fcf_from_billions(dec!(100000000000000000000000)).unwrap_err();
        assert!(err.contains("too large"));
        assert!(fcf_from_billions(Decimal::MIN).is_err());
    }

    #[test]
    fn test_fcf_billions() {
        assert_eq!(fcf_from_billions(dec!(1.25)).unwrap(), dec!(1250000000));
        assert_eq!(fcf_to_billions(dec!(350000000)), dec!(0.35));
        assert_eq!(percent_to_rate(FALLBACK_WACC_PERCENT), dec!(0.075));
        assert_eq!(rate_to_percent(dec!(0.02)), dec!(2));
    }
}
