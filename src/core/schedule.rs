use tracing::debug;

use super::cache::{BucketCache, BucketCacheStats, DEFAULT_BUCKET_CACHE_CAPACITY};
use super::error::{TaxError, TaxResult};

/// A progressive tax schedule: ascending bracket floors with one marginal rate each.
///
/// Rate `i` applies to income in `[limits[i], limits[i + 1])`; the last rate is
/// unbounded above. The tax owed below every floor is precomputed at
/// construction, so evaluation is one bracket lookup plus one multiply-add.
#[derive(Debug, Clone)]
pub struct BracketSchedule {
    limits: Vec<f64>,
    rates: Vec<f64>,
    cumulative_base: Vec<f64>,
    cache: BucketCache,
}

impl BracketSchedule {
    pub fn new(limits: &[f64], rates: &[f64]) -> TaxResult<Self> {
        Self::with_cache_capacity(limits, rates, DEFAULT_BUCKET_CACHE_CAPACITY)
    }

    /// Builds a schedule whose bucket memo holds at most `capacity` values.
    /// A capacity of zero disables memoization.
    pub fn with_cache_capacity(
        limits: &[f64],
        rates: &[f64],
        capacity: usize,
    ) -> TaxResult<Self> {
        validate_brackets(limits, rates)?;

        let mut cumulative_base = Vec::with_capacity(limits.len());
        cumulative_base.push(0.0);
        for i in 1..limits.len() {
            let width = limits[i] - limits[i - 1];
            cumulative_base.push(cumulative_base[i - 1] + rates[i - 1] * width);
        }

        debug!(
            brackets = limits.len(),
            top_floor = limits[limits.len() - 1],
            "built bracket schedule"
        );

        Ok(Self {
            limits: limits.to_vec(),
            rates: rates.to_vec(),
            cumulative_base,
            cache: BucketCache::new(capacity),
        })
    }

    pub fn limits(&self) -> &[f64] {
        &self.limits
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    /// Tax owed on all income up to each bracket floor.
    pub fn cumulative_base(&self) -> &[f64] {
        &self.cumulative_base
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    // Always false once constructed; pairs with `len`.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn cache_stats(&self) -> BucketCacheStats {
        self.cache.stats()
    }

    /// Index of the bracket containing `value`. A value sitting exactly on a
    /// floor belongs to the bracket that floor opens.
    pub fn bucket(&self, value: f64) -> TaxResult<usize> {
        check_income(value)?;
        if let Some(index) = self.cache.get(value) {
            return Ok(index);
        }
        let index = self.search(value)?;
        self.cache.insert(value, index);
        Ok(index)
    }

    fn search(&self, value: f64) -> TaxResult<usize> {
        let last = self.limits.len() - 1;
        let mut low = 0usize;
        let mut high = last;

        while low <= high {
            let mid = low + (high - low) / 2;
            if mid == last {
                return Ok(mid);
            }
            if self.limits[mid] <= value && value < self.limits[mid + 1] {
                return Ok(mid);
            }
            if self.limits[mid] > value {
                let Some(next) = mid.checked_sub(1) else {
                    break;
                };
                high = next;
            } else {
                low = mid + 1;
            }
        }

        Err(TaxError::Internal(format!(
            "no bracket found for value {value} in schedule with {} brackets",
            self.limits.len()
        )))
    }

    pub fn tax(&self, value: f64) -> TaxResult<f64> {
        let i = self.bucket(value)?;
        Ok(self.rates[i] * (value - self.limits[i]) + self.cumulative_base[i])
    }

    /// Rate applied to the next unit of income at `value`.
    pub fn marginal_rate(&self, value: f64) -> TaxResult<f64> {
        let i = self.bucket(value)?;
        Ok(self.rates[i])
    }

    /// Zero and negative incomes have an average rate of zero.
    pub fn average_tax_rate(&self, value: f64) -> TaxResult<f64> {
        if value <= 0.0 {
            return Ok(0.0);
        }
        Ok(self.tax(value)? / value)
    }
}

fn check_income(value: f64) -> TaxResult<()> {
    if !value.is_finite() {
        return Err(TaxError::Validation(format!(
            "can't calculate tax for a non-finite value: {value}"
        )));
    }
    if value < 0.0 {
        return Err(TaxError::Validation(format!(
            "can't calculate tax for negative value: {value}"
        )));
    }
    Ok(())
}

fn validate_brackets(limits: &[f64], rates: &[f64]) -> TaxResult<()> {
    if limits.is_empty() || rates.is_empty() {
        return Err(TaxError::Validation(
            "limits/rates not provided".to_string(),
        ));
    }
    if limits.len() != rates.len() {
        return Err(TaxError::Validation(format!(
            "limits and rates should have the same size, got {} limits and {} rates",
            limits.len(),
            rates.len()
        )));
    }
    if let Some(bad) = limits.iter().chain(rates).find(|v| !v.is_finite()) {
        return Err(TaxError::Validation(format!(
            "limits and rates must be finite, got {bad}"
        )));
    }
    if limits[0] != 0.0 {
        return Err(TaxError::Validation(format!(
            "first lower limit should be 0, currently is {}",
            limits[0]
        )));
    }
    if let Some(i) = limits.windows(2).position(|pair| pair[0] > pair[1]) {
        return Err(TaxError::Validation(format!(
            "limits should be in ascending order, {} is followed by {}",
            limits[i],
            limits[i + 1]
        )));
    }
    Ok(())
}
