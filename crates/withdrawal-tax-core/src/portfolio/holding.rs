use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::WithdrawalTaxError;
use crate::types::{Money, Percent};
use crate::WithdrawalTaxResult;

// ---------------------------------------------------------------------------
// Account & dividend character
// ---------------------------------------------------------------------------

/// Tax wrapper an individual position sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Traditional IRA / 401(k): every withdrawal is ordinary income.
    Deferred,
    /// Taxable brokerage account: taxed by dividend character.
    Brokerage,
    /// Roth IRA: qualified withdrawals are tax-free.
    Roth,
}

impl AccountType {
    pub const ALL: [AccountType; 3] = [
        AccountType::Deferred,
        AccountType::Brokerage,
        AccountType::Roth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Deferred => "deferred",
            AccountType::Brokerage => "brokerage",
            AccountType::Roth => "roth",
        }
    }

    /// Parse a user-supplied account label. Anything outside the three
    /// recognised wrappers is fatal for the run.
    pub fn parse(ticker: &str, value: &str) -> WithdrawalTaxResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deferred" => Ok(AccountType::Deferred),
            "brokerage" => Ok(AccountType::Brokerage),
            "roth" => Ok(AccountType::Roth),
            _ => Err(WithdrawalTaxError::UnknownAccountType {
                ticker: ticker.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tax character of the cash a holding distributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendTaxType {
    Ordinary,
    Qualified,
    CapitalGains,
    Interest,
}

impl DividendTaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DividendTaxType::Ordinary => "ordinary",
            DividendTaxType::Qualified => "qualified",
            DividendTaxType::CapitalGains => "capital_gains",
            DividendTaxType::Interest => "interest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "ordinary" => Some(DividendTaxType::Ordinary),
            "qualified" => Some(DividendTaxType::Qualified),
            "capital_gains" | "capital_gain" | "ltcg" => Some(DividendTaxType::CapitalGains),
            "interest" => Some(DividendTaxType::Interest),
            _ => None,
        }
    }

    /// Whether brokerage income of this character is taxed at preferential rates.
    pub fn is_preferential(&self) -> bool {
        matches!(self, DividendTaxType::Qualified | DividendTaxType::CapitalGains)
    }
}

impl fmt::Display for DividendTaxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Holding
// ---------------------------------------------------------------------------

/// One validated portfolio position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub account_type: AccountType,
    pub shares: Decimal,
    /// Explicit per-share price; takes priority over market data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    /// Total position value, used to derive a price when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<Money>,
    /// Annual yield in percent (3.5 = 3.5%).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_pct: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend_tax_type: Option<DividendTaxType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
}

impl Holding {
    pub fn new(ticker: &str, account_type: AccountType, shares: Decimal) -> Self {
        Holding {
            ticker: normalize_ticker(ticker),
            account_type,
            shares,
            price: None,
            market_value: None,
            yield_pct: None,
            dividend_tax_type: None,
            beta: None,
        }
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_market_value(mut self, market_value: Money) -> Self {
        self.market_value = Some(market_value);
        self
    }

    pub fn with_yield_pct(mut self, yield_pct: Percent) -> Self {
        self.yield_pct = Some(yield_pct);
        self
    }

    pub fn with_dividend_tax_type(mut self, dividend_tax_type: DividendTaxType) -> Self {
        self.dividend_tax_type = Some(dividend_tax_type);
        self
    }

    pub fn with_beta(mut self, beta: Decimal) -> Self {
        self.beta = Some(beta);
        self
    }

    /// Check the structural invariants that do not depend on market data.
    pub fn validate(&self) -> WithdrawalTaxResult<()> {
        if self.ticker.is_empty() {
            return Err(WithdrawalTaxError::malformed("ticker", "ticker must not be empty"));
        }
        if self.shares < Decimal::ZERO {
            return Err(WithdrawalTaxError::malformed(
                format!("{}.shares", self.ticker),
                "shares must be >= 0",
            ));
        }
        if let Some(y) = self.yield_pct {
            if y < Decimal::ZERO {
                return Err(WithdrawalTaxError::malformed(
                    format!("{}.yield_pct", self.ticker),
                    "yield_pct must be >= 0",
                ));
            }
        }
        if let Some(mv) = self.market_value {
            if mv < Decimal::ZERO {
                return Err(WithdrawalTaxError::malformed(
                    format!("{}.market_value", self.ticker),
                    "market_value must be >= 0",
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}
