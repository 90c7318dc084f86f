pub mod holding;
pub mod record;

pub use holding::{AccountType, DividendTaxType, Holding};
pub use record::{parse_records, HoldingRecord, RawValue};
