//! Month-over-month growth

use rust_decimal::Decimal;

/// Percent change from `previous` to `current`
///
/// Returns `None` when there is no previous total or it is zero; callers
/// store that as 0. Negative when spending went down.
pub fn compute_growth(current: Decimal, previous: Option<Decimal>) -> Option<Decimal> {
    let previous = previous.filter(|p| !p.is_zero())?;
    current
        .checked_sub(previous)?
        .checked_div(previous)?
        .checked_mul(Decimal::ONE_HUNDRED)
}
