use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::params::OrdinaryBracket;
use crate::types::{Money, Rate};

/// Income placed in one rate band and the tax it generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSlice {
    /// Band floor in taxable-income terms.
    pub lower: Money,
    /// Band ceiling; `None` for the open top band.
    pub upper: Option<Money>,
    pub rate: Rate,
    /// Income taxed inside this band.
    pub amount: Money,
    pub tax: Money,
}

/// Progressive walk of the brackets, lowest first, stopping once the whole
/// amount has been placed. Only brackets that receive income are returned.
pub fn ordinary_tax_slices(taxable_amount: Money, brackets: &[OrdinaryBracket]) -> Vec<BandSlice> {
    let mut slices = Vec::new();
    if taxable_amount <= Decimal::ZERO {
        return slices;
    }

    let mut lower = Decimal::ZERO;
    for bracket in brackets {
        let top = match bracket.upper {
            Some(upper) => taxable_amount.min(upper),
            None => taxable_amount,
        };
        let here = (top - lower).max(Decimal::ZERO);
        if here > Decimal::ZERO {
            slices.push(BandSlice {
                lower,
                upper: bracket.upper,
                rate: bracket.rate,
                amount: here,
                tax: here * bracket.rate,
            });
        }
        match bracket.upper {
            Some(upper) if taxable_amount > upper => lower = upper,
            _ => break,
        }
    }
    slices
}

/// Ordinary tax on income already reduced by the standard deduction.
pub fn ordinary_tax_on_amount(taxable_amount: Money, brackets: &[OrdinaryBracket]) -> Money {
    ordinary_tax_slices(taxable_amount, brackets)
        .iter()
        .map(|s| s.tax)
        .sum()
}
