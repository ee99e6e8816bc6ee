mod cache;
mod composer;
mod error;
mod schedule;
mod types;

pub use cache::BucketCacheStats;
pub use composer::JurisdictionComposer;
pub use error::{TaxError, TaxResult};
pub use schedule::BracketSchedule;
pub use types::{
    CAPITAL_GAIN_THRESHOLD, FEDERAL_NAME, LOWER_INCLUSION_RATE, TaxBreakdown,
    UPPER_INCLUSION_RATE, capital_gains_adjusted_income,
};
