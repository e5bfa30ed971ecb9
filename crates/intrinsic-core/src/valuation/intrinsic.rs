use rust_decimal::Decimal;

use crate::types::Money;

/// Equity value = enterprise value - net debt; `None` on overflow.
pub fn equity_value(enterprise_value: Money, net_debt: Money) -> Option<Money> {
    enterprise_value.checked_sub(net_debt)
}

/// (enterprise value - net debt) / shares outstanding.
///
/// Returns `None` when there are no shares to divide by, or when the
/// quotient does not fit in a `Decimal`; zero is never used as a stand-in
/// for "not computable".
pub fn intrinsic_value_per_share(
    enterprise_value: Money,
    net_debt: Money,
    shares_outstanding: Decimal,
) -> Option<Money> {
    if shares_outstanding > Decimal::ZERO {
        equity_value(enterprise_value, net_debt)?.checked_div(shares_outstanding)
    } else {
        None
    }
}
