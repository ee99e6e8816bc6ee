use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::error::{TaxError, TaxResult};
use super::schedule::BracketSchedule;
use super::types::{FEDERAL_NAME, TaxBreakdown, capital_gains_adjusted_income};

/// One fixed federal schedule plus any number of named regional schedules.
///
/// Both schedules are evaluated independently against the same taxable base
/// and summed. Regional registration goes through a single lock, so a
/// composer can be shared behind an `Arc` by readers and writers alike.
#[derive(Debug)]
pub struct JurisdictionComposer {
    federal: BracketSchedule,
    regions: Mutex<HashMap<String, Arc<BracketSchedule>>>,
}

impl JurisdictionComposer {
    pub fn new(federal_limits: &[f64], federal_rates: &[f64]) -> TaxResult<Self> {
        Ok(Self {
            federal: BracketSchedule::new(federal_limits, federal_rates)?,
            regions: Mutex::new(HashMap::new()),
        })
    }

    pub fn federal(&self) -> &BracketSchedule {
        &self.federal
    }

    /// Installs a regional schedule, replacing any schedule already stored
    /// under `name`. Nothing is installed if the brackets are invalid.
    pub fn register(&self, name: &str, limits: &[f64], rates: &[f64]) -> TaxResult<()> {
        let schedule = Arc::new(BracketSchedule::new(limits, rates)?);
        let previous = self.regions.lock().insert(name.to_string(), schedule);
        if previous.is_some() {
            warn!(jurisdiction = name, "replaced existing regional schedule");
        } else {
            info!(jurisdiction = name, brackets = limits.len(), "registered regional schedule");
        }
        Ok(())
    }

    pub fn list_jurisdictions(&self) -> BTreeSet<String> {
        self.regions.lock().keys().cloned().collect()
    }

    pub fn resolve(&self, name: &str) -> TaxResult<Arc<BracketSchedule>> {
        self.regions
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| TaxError::NotFound(format!("there's no regional schedule for {name}")))
    }

    pub fn combined_tax(
        &self,
        name: &str,
        value: f64,
        capital_gain_fraction: f64,
    ) -> TaxResult<f64> {
        let adjusted = capital_gains_adjusted_income(value, capital_gain_fraction)?;
        let regional = self.resolve(name)?;
        Ok(self.federal.tax(adjusted)? + regional.tax(adjusted)?)
    }

    /// Combined tax relative to the unadjusted income; zero income has a zero rate.
    pub fn combined_average_rate(
        &self,
        name: &str,
        value: f64,
        capital_gain_fraction: f64,
    ) -> TaxResult<f64> {
        if value == 0.0 {
            return Ok(0.0);
        }
        Ok(self.combined_tax(name, value, capital_gain_fraction)? / value)
    }

    pub fn breakdown(
        &self,
        name: &str,
        value: f64,
        capital_gain_fraction: f64,
    ) -> TaxResult<TaxBreakdown> {
        let adjusted = capital_gains_adjusted_income(value, capital_gain_fraction)?;
        let regional = self.resolve(name)?;

        let federal_tax = self.federal.tax(adjusted)?;
        let regional_tax = regional.tax(adjusted)?;
        let total_tax = federal_tax + regional_tax;
        let average_rate = if value == 0.0 { 0.0 } else { total_tax / value };

        debug!(
            jurisdiction = name,
            income = value,
            adjusted_income = adjusted,
            federal_tax,
            regional_tax,
            "evaluated combined tax"
        );

        Ok(TaxBreakdown {
            jurisdiction: name.to_string(),
            income: value,
            capital_gain_fraction,
            adjusted_income: adjusted,
            federal_tax,
            regional_tax,
            total_tax,
            average_rate,
            federal_marginal_rate: self.federal.marginal_rate(adjusted)?,
            regional_marginal_rate: regional.marginal_rate(adjusted)?,
        })
    }

    pub fn federal_name(&self) -> &'static str {
        FEDERAL_NAME
    }
}
