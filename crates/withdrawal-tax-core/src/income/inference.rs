use crate::market_data::TickerData;
use crate::portfolio::DividendTaxType;

/// Strategy for guessing a holding's dividend character when the portfolio
/// does not state it.
pub trait DividendTypeInference {
    fn infer(&self, ticker: &str, data: &TickerData) -> DividendTaxType;

    /// Short label recorded in computation assumptions.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Any dividend history at all means `qualified`; none means `ordinary`.
///
/// Coarse: bond funds and REITs pay non-qualified distributions and still
/// have a history. Override `dividend_type` per holding where that matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryPresenceInference;

impl DividendTypeInference for HistoryPresenceInference {
    fn infer(&self, _ticker: &str, data: &TickerData) -> DividendTaxType {
        if data.has_dividend_history() {
            DividendTaxType::Qualified
        } else {
            DividendTaxType::Ordinary
        }
    }

    fn name(&self) -> &'static str {
        "history_presence"
    }
}

/// Treat every un-annotated holding as the same character.
#[derive(Debug, Clone, Copy)]
pub struct FixedInference(pub DividendTaxType);

impl DividendTypeInference for FixedInference {
    fn infer(&self, _ticker: &str, _data: &TickerData) -> DividendTaxType {
        self.0
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
