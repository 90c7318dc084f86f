use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

const BASE_THRESHOLD: Money = dec!(25_000);
const ADJUSTED_THRESHOLD: Money = dec!(34_000);
const LOWER_TIER_RATE: Rate = dec!(0.5);
const UPPER_TIER_RATE: Rate = dec!(0.85);
/// 50% of the 9,000 gap between the two thresholds.
const LOWER_TIER_CAP: Money = dec!(4_500);

/// How much of the year's benefit is taxable, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialSecurityTaxation {
    pub ss_annual: Money,
    pub provisional_income: Money,
    pub taxable_amount: Money,
}

/// Two-tier provisional-income rule.
///
/// Simplified against the IRS worksheet: the middle tier is not capped at
/// half the benefit and the upper tier only caps at 85% of it.
pub fn taxable_social_security(ordinary_before_ss: Money, ss_annual: Money) -> SocialSecurityTaxation {
    if ss_annual <= Decimal::ZERO {
        return SocialSecurityTaxation {
            ss_annual: Decimal::ZERO,
            provisional_income: ordinary_before_ss,
            taxable_amount: Decimal::ZERO,
        };
    }

    let provisional = ordinary_before_ss + LOWER_TIER_RATE * ss_annual;
    let taxable = if provisional <= BASE_THRESHOLD {
        Decimal::ZERO
    } else if provisional <= ADJUSTED_THRESHOLD {
        LOWER_TIER_RATE * (provisional - BASE_THRESHOLD)
    } else {
        let phased = UPPER_TIER_RATE * (provisional - ADJUSTED_THRESHOLD) + LOWER_TIER_CAP;
        phased.min(UPPER_TIER_RATE * ss_annual)
    };

    SocialSecurityTaxation {
        ss_annual,
        provisional_income: provisional,
        taxable_amount: taxable,
    }
}
