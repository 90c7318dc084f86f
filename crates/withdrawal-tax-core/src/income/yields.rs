use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::market_data::DividendPayment;
use crate::types::{Money, Percent};

/// Start of the trailing twelve-month window ending on `as_of` (exclusive).
pub fn trailing_window_start(as_of: NaiveDate) -> NaiveDate {
    as_of.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN)
}

/// Per-share dividends paid in `(as_of - 12 months, as_of]`.
/// `None` if the total does not fit in a Decimal.
pub fn trailing_dividends(history: &[DividendPayment], as_of: NaiveDate) -> Option<Money> {
    let start = trailing_window_start(as_of);
    let total = history
        .iter()
        .filter(|p| p.date > start && p.date <= as_of)
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.amount))?;
    Some(total.max(Decimal::ZERO))
}

/// Trailing twelve-month yield in percent. Zero for an empty history or a
/// non-positive price, `None` on overflow.
pub fn trailing_yield_pct(
    history: &[DividendPayment],
    price: Money,
    as_of: NaiveDate,
) -> Option<Percent> {
    if price <= Decimal::ZERO || history.is_empty() {
        return Some(Decimal::ZERO);
    }
    trailing_dividends(history, as_of)?
        .checked_div(price)?
        .checked_mul(dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pay(y: i32, m: u32, d: u32, amount: Decimal) -> DividendPayment {
        DividendPayment {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            amount,
        }
    }

    #[test]
    fn test_only_last_twelve_months_count() {
        let as_of = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        let history = vec![
            pay(2025, 6, 30, dec!(0.50)), // exactly 12 months back: excluded
            pay(2025, 9, 15, dec!(0.60)),
            pay(2025, 12, 15, dec!(0.60)),
            pay(2026, 3, 15, dec!(0.65)),
            pay(2026, 6, 30, dec!(0.65)),
            pay(2026, 7, 15, dec!(0.70)), // after as_of: excluded
        ];
        assert_eq!(trailing_dividends(&history, as_of), Some(dec!(2.50)));
        assert_eq!(trailing_yield_pct(&history, dec!(50), as_of), Some(dec!(5)));
    }

    #[test]
    fn test_empty_history_yields_zero() {
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(trailing_yield_pct(&[], dec!(40), as_of), Some(Decimal::ZERO));
    }

    #[test]
    fn test_zero_price_yields_zero() {
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let history = vec![pay(2025, 12, 1, dec!(1))];
        assert_eq!(trailing_yield_pct(&history, Decimal::ZERO, as_of), Some(Decimal::ZERO));
    }

    #[test]
    fn test_oversized_history_is_none() {
        let as_of = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let history = vec![pay(2025, 6, 1, Decimal::MAX), pay(2025, 9, 1, Decimal::MAX)];
        assert_eq!(trailing_dividends(&history, as_of), None);
        assert_eq!(trailing_yield_pct(&history, dec!(10), as_of), None);
    }
}
