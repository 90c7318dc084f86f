pub mod brackets;
pub mod engine;
pub mod params;
pub mod preferential;
pub mod social_security;

pub use brackets::{ordinary_tax_on_amount, ordinary_tax_slices, BandSlice};
pub use engine::{compute_tax, estimate_tax, TaxBreakdown, TaxInput, TaxResult};
pub use params::{FilingParameters, OrdinaryBracket};
pub use preferential::{preferential_slices, preferential_tax_on_amount};
pub use social_security::{taxable_social_security, SocialSecurityTaxation};
