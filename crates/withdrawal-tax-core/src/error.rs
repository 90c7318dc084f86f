use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WithdrawalTaxError {
    #[error("Unresolved price for {ticker}: no explicit price, market value or market data")]
    UnresolvedPrice { ticker: String },

    #[error("Unknown account type '{value}' for {ticker} (expected deferred, brokerage or roth)")]
    UnknownAccountType { ticker: String, value: String },

    #[error("Invalid income bucket: {bucket} is negative ({amount})")]
    InvalidBucket { bucket: String, amount: Decimal },

    #[error("Malformed input: {field}: {reason}")]
    MalformedInput { field: String, reason: String },

    #[error("Invalid filing parameters: {0}")]
    InvalidFilingParameters(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl WithdrawalTaxError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        WithdrawalTaxError::MalformedInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// A product or sum that does not fit in a Decimal.
    pub(crate) fn overflow(field: impl Into<String>) -> Self {
        Self::malformed(field, "value is too large to compute")
    }
}

impl From<serde_json::Error> for WithdrawalTaxError {
    fn from(e: serde_json::Error) -> Self {
        WithdrawalTaxError::SerializationError(e.to_string())
    }
}
