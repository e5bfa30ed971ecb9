use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// `$1,234.56`, `-$1,234.56`. Rounded half-to-even at 2 dp.
pub fn format_currency(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Currency, or `fallback` when the value is not available.
pub fn format_optional_currency(value: Option<Decimal>, fallback: &str) -> String {
    value.map(format_currency).unwrap_or_else(|| fallback.to_string())
}

/// Decimal rate as a percentage with 2 dp: `0.095` -> `9.50%`.
pub fn format_percent(rate: Decimal) -> String {
    format!("{:.2}%", rate.saturating_mul(dec!(100)))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_currency_grouping() {
        assert_eq!(format_currency(dec!(1234.56)), "$1,234.56");
        assert_eq!(format_currency(dec!(19243506931.92296)), "$19,243,506,931.92");
        assert_eq!(format_currency(dec!(999)), "$999.00");
        assert_eq!(format_currency(dec!(100000)), "$100,000.00");
        assert_eq!(format_currency(Decimal::ZERO), "$0.00");
    }

    #[test]
    fn test_currency_negative_and_rounding() {
        assert_eq!(format_currency(dec!(-20)), "-$20.00");
        assert_eq!(format_currency(dec!(-1234567.891)), "-$1,234,567.89");
        // Banker's rounding
        assert_eq!(format_currency(dec!(0.125)), "$0.12");
        assert_eq!(format_currency(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn test_optional_currency() {
        assert_eq!(format_optional_currency(None, "n/a"), "n/a");
        assert_eq!(format_optional_currency(Some(dec!(172.435)), "n/a"), "$172.44");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(dec!(0.095)), "9.50%");
        assert_eq!(format_percent(dec!(0.02)), "2.00%");
        assert_eq!(format_percent(dec!(0.0818)), "8.18%");
    }
}
