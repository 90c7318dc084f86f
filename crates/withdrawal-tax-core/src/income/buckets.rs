use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use crate::error::WithdrawalTaxError;
use crate::types::Money;
use crate::WithdrawalTaxResult;

/// Tax character an income stream is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeBucket {
    DeferredOrdinary,
    BrokerageOrdinary,
    BrokerageQualified,
    BrokerageCapitalGains,
    RothTaxfree,
}

impl IncomeBucket {
    pub const ALL: [IncomeBucket; 5] = [
        IncomeBucket::DeferredOrdinary,
        IncomeBucket::BrokerageOrdinary,
        IncomeBucket::BrokerageQualified,
        IncomeBucket::BrokerageCapitalGains,
        IncomeBucket::RothTaxfree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncomeBucket::DeferredOrdinary => "deferred_ordinary",
            IncomeBucket::BrokerageOrdinary => "brokerage_ordinary",
            IncomeBucket::BrokerageQualified => "brokerage_qualified",
            IncomeBucket::BrokerageCapitalGains => "brokerage_capital_gains",
            IncomeBucket::RothTaxfree => "roth_taxfree",
        }
    }
}

impl fmt::Display for IncomeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annual income aggregated by tax character.
///
/// Always rebuilt from scratch for a run; addition is the only way buckets
/// combine, so any classification order yields the same totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeBuckets {
    pub deferred_ordinary: Money,
    pub brokerage_ordinary: Money,
    pub brokerage_qualified: Money,
    pub brokerage_capital_gains: Money,
    pub roth_taxfree: Money,
}

impl IncomeBuckets {
    /// A bucket set holding `amount` in a single bucket.
    pub fn single(bucket: IncomeBucket, amount: Money) -> Self {
        let mut buckets = IncomeBuckets::default();
        buckets.credit(bucket, amount);
        buckets
    }

    pub fn get(&self, bucket: IncomeBucket) -> Money {
        match bucket {
            IncomeBucket::DeferredOrdinary => self.deferred_ordinary,
            IncomeBucket::BrokerageOrdinary => self.brokerage_ordinary,
            IncomeBucket::BrokerageQualified => self.brokerage_qualified,
            IncomeBucket::BrokerageCapitalGains => self.brokerage_capital_gains,
            IncomeBucket::RothTaxfree => self.roth_taxfree,
        }
    }

    pub fn credit(&mut self, bucket: IncomeBucket, amount: Money) {
        match bucket {
            IncomeBucket::DeferredOrdinary => self.deferred_ordinary += amount,
            IncomeBucket::BrokerageOrdinary => self.brokerage_ordinary += amount,
            IncomeBucket::BrokerageQualified => self.brokerage_qualified += amount,
            IncomeBucket::BrokerageCapitalGains => self.brokerage_capital_gains += amount,
            IncomeBucket::RothTaxfree => self.roth_taxfree += amount,
        }
    }

    /// Replace one bucket's amount.
    pub fn set(&mut self, bucket: IncomeBucket, amount: Money) {
        match bucket {
            IncomeBucket::DeferredOrdinary => self.deferred_ordinary = amount,
            IncomeBucket::BrokerageOrdinary => self.brokerage_ordinary = amount,
            IncomeBucket::BrokerageQualified => self.brokerage_qualified = amount,
            IncomeBucket::BrokerageCapitalGains => self.brokerage_capital_gains = amount,
            IncomeBucket::RothTaxfree => self.roth_taxfree = amount,
        }
    }

    /// Bucket-wise addition; `None` if any bucket overflows.
    pub fn checked_add(&self, rhs: &IncomeBuckets) -> Option<IncomeBuckets> {
        Some(IncomeBuckets {
            deferred_ordinary: self.deferred_ordinary.checked_add(rhs.deferred_ordinary)?,
            brokerage_ordinary: self.brokerage_ordinary.checked_add(rhs.brokerage_ordinary)?,
            brokerage_qualified: self.brokerage_qualified.checked_add(rhs.brokerage_qualified)?,
            brokerage_capital_gains: self
                .brokerage_capital_gains
                .checked_add(rhs.brokerage_capital_gains)?,
            roth_taxfree: self.roth_taxfree.checked_add(rhs.roth_taxfree)?,
        })
    }

    /// [`total`](Self::total) without the risk of overflow.
    pub fn checked_total(&self) -> Option<Money> {
        IncomeBucket::ALL
            .iter()
            .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(self.get(*b)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (IncomeBucket, Money)> + '_ {
        IncomeBucket::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    /// Ordinary income before any Social Security is added.
    pub fn ordinary_income(&self) -> Money {
        self.deferred_ordinary + self.brokerage_ordinary
    }

    /// Income taxed at preferential rates.
    pub fn preferential_income(&self) -> Money {
        self.brokerage_qualified + self.brokerage_capital_gains
    }

    /// Everything except Roth income.
    pub fn taxable_total(&self) -> Money {
        self.ordinary_income() + self.preferential_income()
    }

    pub fn total(&self) -> Money {
        self.taxable_total() + self.roth_taxfree
    }

    /// Reject negative buckets. A negative amount can only come from a
    /// classifier defect, so it is surfaced instead of clamped.
    pub fn validate(&self) -> WithdrawalTaxResult<()> {
        for (bucket, amount) in self.iter() {
            if amount < Decimal::ZERO {
                return Err(WithdrawalTaxError::InvalidBucket {
                    bucket: bucket.as_str().to_string(),
                    amount,
                });
            }
        }
        Ok(())
    }
}

impl Add for IncomeBuckets {
    type Output = IncomeBuckets;

    fn add(mut self, rhs: IncomeBuckets) -> IncomeBuckets {
        self += rhs;
        self
    }
}

impl AddAssign for IncomeBuckets {
    fn add_assign(&mut self, rhs: IncomeBuckets) {
        for (bucket, amount) in rhs.iter() {
            self.credit(bucket, amount);
        }
    }
}

impl Sum for IncomeBuckets {
    fn sum<I: Iterator<Item = IncomeBuckets>>(iter: I) -> Self {
        iter.fold(IncomeBuckets::default(), |acc, b| acc + b)
    }
}
