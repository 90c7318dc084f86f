use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::brackets::BandSlice;
use super::params::FilingParameters;
use crate::types::{Money, Rate};

const ZERO_RATE: Rate = dec!(0);
const MID_RATE: Rate = dec!(0.15);
const TOP_RATE: Rate = dec!(0.20);

/// Place `amount` of preferential income on top of `occupied` taxable income.
///
/// The 0% band is filled first, then the 15% band, remainder at 20%. Each
/// band's free space is measured from what is already stacked below it.
pub fn preferential_slices(
    amount: Money,
    occupied: Money,
    params: &FilingParameters,
) -> Vec<BandSlice> {
    let mut slices = Vec::new();
    if amount <= Decimal::ZERO {
        return slices;
    }
    let mut remaining = amount;

    let zero_space = (params.cg_0pct_limit - occupied).max(Decimal::ZERO);
    let take_zero = remaining.min(zero_space);
    remaining -= take_zero;
    push(&mut slices, Decimal::ZERO, Some(params.cg_0pct_limit), ZERO_RATE, take_zero);

    let already = occupied + take_zero;
    let mid_space = (params.cg_15pct_limit - already).max(Decimal::ZERO);
    let take_mid = remaining.min(mid_space);
    remaining -= take_mid;
    push(
        &mut slices,
        params.cg_0pct_limit,
        Some(params.cg_15pct_limit),
        MID_RATE,
        take_mid,
    );

    push(&mut slices, params.cg_15pct_limit, None, TOP_RATE, remaining);
    slices
}

/// Preferential-rate tax on `amount` stacked above `occupied`.
pub fn preferential_tax_on_amount(amount: Money, occupied: Money, params: &FilingParameters) -> Money {
    preferential_slices(amount, occupied, params)
        .iter()
        .map(|s| s.tax)
        .sum()
}

fn push(slices: &mut Vec<BandSlice>, lower: Money, upper: Option<Money>, rate: Rate, amount: Money) {
    if amount > Decimal::ZERO {
        slices.push(BandSlice {
            lower,
            upper,
            rate,
            amount,
            tax: amount * rate,
        });
    }
}
