use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::WithdrawalTaxError;
use crate::types::{Money, Rate};
use crate::WithdrawalTaxResult;

/// One marginal bracket. `upper = None` marks the open-ended top bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinaryBracket {
    #[serde(default)]
    pub upper: Option<Money>,
    pub rate: Rate,
}

impl OrdinaryBracket {
    pub fn bounded(upper: Money, rate: Rate) -> Self {
        OrdinaryBracket {
            upper: Some(upper),
            rate,
        }
    }

    pub fn unbounded(rate: Rate) -> Self {
        OrdinaryBracket { upper: None, rate }
    }
}

/// Tax-year and filing-status constants. Pure data; the engine holds the logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingParameters {
    pub tax_year: i32,
    pub filing_status: String,
    pub standard_deduction: Money,
    /// Ascending, contiguous from zero, last one unbounded.
    pub ordinary_brackets: Vec<OrdinaryBracket>,
    /// Taxable income at which the 0% preferential band ends.
    pub cg_0pct_limit: Money,
    /// Taxable income at which the 15% preferential band ends; 20% above.
    pub cg_15pct_limit: Money,
}

impl FilingParameters {
    /// 2026 single filer (Rev. Proc. 2025-32).
    pub fn single_2026() -> Self {
        FilingParameters {
            tax_year: 2026,
            filing_status: "single".to_string(),
            standard_deduction: dec!(16_100),
            ordinary_brackets: vec![
                OrdinaryBracket::bounded(dec!(12_400), dec!(0.10)),
                OrdinaryBracket::bounded(dec!(50_400), dec!(0.12)),
                OrdinaryBracket::bounded(dec!(105_700), dec!(0.22)),
                OrdinaryBracket::bounded(dec!(201_775), dec!(0.24)),
                OrdinaryBracket::bounded(dec!(256_225), dec!(0.32)),
                OrdinaryBracket::bounded(dec!(640_600), dec!(0.35)),
                OrdinaryBracket::unbounded(dec!(0.37)),
            ],
            cg_0pct_limit: dec!(49_450),
            cg_15pct_limit: dec!(545_500),
        }
    }

    pub fn validate(&self) -> WithdrawalTaxResult<()> {
        if self.standard_deduction < Decimal::ZERO {
            return Err(invalid("standard_deduction must be >= 0"));
        }
        if self.ordinary_brackets.is_empty() {
            return Err(invalid("at least one ordinary bracket is required"));
        }

        let last = self.ordinary_brackets.len() - 1;
        let mut previous = Decimal::ZERO;
        for (i, bracket) in self.ordinary_brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(invalid(format!(
                    "bracket {i} rate {} is outside [0, 1]",
                    bracket.rate
                )));
            }
            match (bracket.upper, i == last) {
                (Some(upper), false) => {
                    if upper <= previous {
                        return Err(invalid(format!(
                            "bracket {i} upper bound {upper} must exceed {previous}"
                        )));
                    }
                    previous = upper;
                }
                (None, true) => {}
                (Some(_), true) => {
                    return Err(invalid("the last ordinary bracket must be unbounded"));
                }
                (None, false) => {
                    return Err(invalid(format!(
                        "bracket {i} is unbounded but is not the last bracket"
                    )));
                }
            }
        }

        if self.cg_0pct_limit < Decimal::ZERO {
            return Err(invalid("cg_0pct_limit must be >= 0"));
        }
        if self.cg_0pct_limit > self.cg_15pct_limit {
            return Err(invalid("cg_0pct_limit must not exceed cg_15pct_limit"));
        }
        Ok(())
    }
}

impl Default for FilingParameters {
    fn default() -> Self {
        FilingParameters::single_2026()
    }
}

fn invalid(reason: impl Into<String>) -> WithdrawalTaxError {
    WithdrawalTaxError::InvalidFilingParameters(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_is_valid() {
        FilingParameters::single_2026().validate().unwrap();
    }

    #[test]
    fn test_non_increasing_bounds_rejected() {
        let mut p = FilingParameters::single_2026();
        p.ordinary_brackets[1].upper = Some(dec!(12_400));
        assert!(matches!(
            p.validate(),
            Err(WithdrawalTaxError::InvalidFilingParameters(_))
        ));
    }

    #[test]
    fn test_bounded_top_bracket_rejected() {
        let mut p = FilingParameters::single_2026();
        p.ordinary_brackets.last_mut().unwrap().upper = Some(dec!(1_000_000));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_unbounded_middle_bracket_rejected() {
        let mut p = FilingParameters::single_2026();
        p.ordinary_brackets[2].upper = None;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_inverted_cg_limits_rejected() {
        let mut p = FilingParameters::single_2026();
        p.cg_0pct_limit = dec!(600_000);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_parameters_roundtrip_through_json_with_numbers() {
        let json = r#"{
            "tax_year": 2026, "filing_status": "single", "standard_deduction": 16100,
            "ordinary_brackets": [{"upper": 10000, "rate": 0.1}, {"rate": 0.2}],
            "cg_0pct_limit": 40000, "cg_15pct_limit": 500000
        }"#;
        let p: FilingParameters = serde_json::from_str(json).unwrap();
        p.validate().unwrap();
        assert_eq!(p.ordinary_brackets[1].upper, None);
        assert_eq!(p.ordinary_brackets[0].rate, dec!(0.1));
    }
}
