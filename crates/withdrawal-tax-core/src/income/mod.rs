pub mod buckets;
pub mod classifier;
pub mod inference;
pub mod yields;

pub use buckets::{IncomeBucket, IncomeBuckets};
pub use classifier::{
    classify, classify_holding, classify_with, needs_market_data, route_income, Classification,
    ClassifiedHolding, ValueSource,
};
pub use inference::{DividendTypeInference, FixedInference, HistoryPresenceInference};
