pub mod error;
pub mod estimator;
pub mod income;
pub mod market_data;
pub mod portfolio;
pub mod tax;
pub mod types;

#[cfg(feature = "beta")]
pub mod beta;

pub use error::WithdrawalTaxError;
pub use types::*;

/// Standard result type for all withdrawal-tax operations
pub type WithdrawalTaxResult<T> = Result<T, WithdrawalTaxError>;
