use serde::Serialize;

use super::error::{TaxError, TaxResult};

/// Capital gains above this amount are included at the higher rate.
pub const CAPITAL_GAIN_THRESHOLD: f64 = 250_000.0;
pub const LOWER_INCLUSION_RATE: f64 = 0.5;
pub const UPPER_INCLUSION_RATE: f64 = 2.0 / 3.0;

pub const FEDERAL_NAME: &str = "Federal";

/// Taxable base after partial inclusion of the capital-gain share of `value`.
///
/// The ordinary share is fully included; the gain is included at 50% up to
/// [`CAPITAL_GAIN_THRESHOLD`] and at two thirds beyond it.
pub fn capital_gains_adjusted_income(value: f64, capital_gain_fraction: f64) -> TaxResult<f64> {
    if !value.is_finite() {
        return Err(TaxError::Validation(format!(
            "income must be a finite number, got {value}"
        )));
    }
    if !(0.0..=1.0).contains(&capital_gain_fraction) {
        return Err(TaxError::Validation(format!(
            "capital gain fraction should be between 0 and 1, got {capital_gain_fraction}"
        )));
    }

    let gain = capital_gain_fraction * value;
    let ordinary = (1.0 - capital_gain_fraction) * value;
    let lower = gain.min(CAPITAL_GAIN_THRESHOLD) * LOWER_INCLUSION_RATE;
    let upper = (gain - CAPITAL_GAIN_THRESHOLD).max(0.0) * UPPER_INCLUSION_RATE;
    Ok(ordinary + lower + upper)
}

/// Federal and regional components of a combined liability.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxBreakdown {
    pub jurisdiction: String,
    pub income: f64,
    pub capital_gain_fraction: f64,
    pub adjusted_income: f64,
    pub federal_tax: f64,
    pub regional_tax: f64,
    pub total_tax: f64,
    pub average_rate: f64,
    pub federal_marginal_rate: f64,
    pub regional_marginal_rate: f64,
}
