//! Sweep aggregation over categories of parameter tuples.
//!
//! Each category moves through `Pending → Accumulating → Finalized`:
//! a [`Category`] is pending, [`Category::begin`] yields a
//! [`CategoryAccumulator`], and [`CategoryAccumulator::finalize`] consumes it
//! into an immutable [`CategoryResult`].

use crate::clock::MonotonicClock;
use crate::operation::Operation;
use crate::sampler::{MemorySampler, SampledRun};
use opprof_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Identifier of a sweep category (e.g. "small", or cost tier "2")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CategoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for CategoryId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// A category: ordered parameter tuples and a repetition count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category<P> {
    id: CategoryId,
    params: Vec<P>,
    repetitions: usize,
}

impl<P> Category<P> {
    /// Create a category
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if `params` is empty or `repetitions`
    /// is zero.
    pub fn new(id: impl Into<CategoryId>, params: Vec<P>, repetitions: usize) -> Result<Self> {
        let id = id.into();
        if params.is_empty() {
            return Err(Error::invalid_config(format!(
                "category '{id}' has no parameter tuples"
            )));
        }
        if repetitions == 0 {
            return Err(Error::invalid_config(format!(
                "category '{id}' must repeat at least once"
            )));
        }
        params.len().checked_mul(repetitions).ok_or_else(|| {
            Error::invalid_config(format!("category '{id}' sample count overflows"))
        })?;

        Ok(Self {
            id,
            params,
            repetitions,
        })
    }

    /// Category identifier
    #[must_use]
    pub const fn id(&self) -> &CategoryId {
        &self.id
    }

    /// Parameter tuples in evaluation order
    #[must_use]
    pub fn params(&self) -> &[P] {
        &self.params
    }

    /// Number of passes over the parameter list
    #[must_use]
    pub const fn repetitions(&self) -> usize {
        self.repetitions
    }

    /// Number of sampled runs the category averages over
    #[must_use]
    pub fn sample_count(&self) -> usize {
        // Overflow is rejected in `new`
        self.params.len().saturating_mul(self.repetitions)
    }

    /// Start accumulating results for this category
    #[must_use]
    pub fn begin(&self) -> CategoryAccumulator {
        CategoryAccumulator {
            id: self.id.clone(),
            expected: self.sample_count(),
            recorded: 0,
            wall_total: Duration::ZERO,
            peak_total: 0,
        }
    }
}

/// Running sums for a category being swept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAccumulator {
    id: CategoryId,
    expected: usize,
    recorded: usize,
    wall_total: Duration,
    peak_total: u128,
}

impl CategoryAccumulator {
    /// Fold one sampled run into the sums
    pub fn record(&mut self, run: &SampledRun) {
        self.recorded = self.recorded.saturating_add(1);
        self.wall_total = self.wall_total.saturating_add(run.duration);
        self.peak_total = self
            .peak_total
            .saturating_add(u128::from(run.peak_resident_bytes));
    }

    /// Runs recorded so far
    #[must_use]
    pub const fn recorded(&self) -> usize {
        self.recorded
    }

    /// Produce the category's averages
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the number of recorded runs differs
    /// from the category's sample count.
    #[allow(clippy::cast_precision_loss)]
    pub fn finalize(self) -> Result<CategoryResult> {
        if self.recorded != self.expected || self.recorded == 0 {
            return Err(Error::invalid_config(format!(
                "category '{}' recorded {} of {} runs",
                self.id, self.recorded, self.expected
            )));
        }

        let n = self.recorded as f64;
        Ok(CategoryResult {
            category: self.id,
            avg_wall_seconds: self.wall_total.as_secs_f64() / n,
            avg_peak_resident_bytes: self.peak_total as f64 / n,
            samples: self.recorded,
        })
    }
}

/// Averages for one finalized category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryResult {
    /// Category identifier
    pub category: CategoryId,

    /// Mean wall-clock seconds per sampled run
    pub avg_wall_seconds: f64,

    /// Mean peak resident bytes per sampled run
    pub avg_peak_resident_bytes: f64,

    /// Number of sampled runs averaged
    pub samples: usize,
}

/// An ordered, validated set of categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan<P> {
    categories: Vec<Category<P>>,
}

impl<P> SweepPlan<P> {
    /// Create a plan; categories are evaluated in the given order
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if there are no categories or an id
    /// appears twice.
    pub fn new(categories: Vec<Category<P>>) -> Result<Self> {
        if categories.is_empty() {
            return Err(Error::invalid_config("sweep plan has no categories"));
        }

        let mut seen = HashSet::with_capacity(categories.len());
        if let Some(dup) = categories.iter().find(|c| !seen.insert(c.id())) {
            return Err(Error::invalid_config(format!(
                "duplicate category '{}'",
                dup.id()
            )));
        }

        Ok(Self { categories })
    }

    /// Categories in evaluation order
    #[must_use]
    pub fn categories(&self) -> &[Category<P>] {
        &self.categories
    }

    /// Total sampled runs across all categories
    #[must_use]
    pub fn total_samples(&self) -> usize {
        self.categories
            .iter()
            .map(Category::sample_count)
            .fold(0, usize::saturating_add)
    }
}

/// Drives the memory sampler across a sweep plan
pub struct SweepRunner<'a> {
    sampler: &'a MemorySampler,
    clock: &'a dyn MonotonicClock,
}

impl<'a> SweepRunner<'a> {
    /// Create a runner
    #[must_use]
    pub const fn new(sampler: &'a MemorySampler, clock: &'a dyn MonotonicClock) -> Self {
        Self { sampler, clock }
    }

    /// Run the whole plan, one result per category in plan order.
    ///
    /// For every repetition and every parameter tuple (in list order) a fresh
    /// operation is built with `factory` and measured once.
    ///
    /// # Errors
    ///
    /// Returns `Error::SweepFailed` with the category, parameter tuple and
    /// repetition of the first factory or operation failure.
    pub fn run<P, O, F>(&self, plan: &SweepPlan<P>, mut factory: F) -> Result<Vec<CategoryResult>>
    where
        P: fmt::Debug,
        O: Operation,
        F: FnMut(&P) -> Result<O>,
    {
        plan.categories()
            .iter()
            .map(|category| self.run_category(category, &mut factory))
            .collect()
    }

    /// Sweep a single category to its finalized result
    ///
    /// # Errors
    ///
    /// Returns `Error::SweepFailed` on the first factory or operation failure.
    pub fn run_category<P, O, F>(&self, category: &Category<P>, factory: &mut F) -> Result<CategoryResult>
    where
        P: fmt::Debug,
        O: Operation,
        F: FnMut(&P) -> Result<O>,
    {
        let mut acc = category.begin();
        debug!(category = %category.id(), samples = category.sample_count(), "category started");

        for repetition in 0..category.repetitions() {
            for params in category.params() {
                let run = factory(params)
                    .and_then(|mut op| self.sampler.measure(self.clock, &mut op))
                    .map_err(|e| e.in_sweep(category.id().as_str(), format!("{params:?}"), repetition))?;
                acc.record(&run);
            }
        }

        let result = acc.finalize()?;
        info!(
            category = %result.category,
            avg_wall_seconds = result.avg_wall_seconds,
            avg_peak_resident_bytes = result.avg_peak_resident_bytes,
            samples = result.samples,
            "category finalized"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(duration_ms: u64, peak: u64) -> SampledRun {
        SampledRun {
            duration: Duration::from_millis(duration_ms),
            peak_resident_bytes: peak,
            probes: 1,
        }
    }

    #[test]
    fn test_category_rejects_empty_params() {
        let category = Category::<u32>::new("small", vec![], 3);
        assert!(matches!(category, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_category_rejects_zero_repetitions() {
        let category = Category::new(1u32, vec![(1, 65536, 1)], 0);
        assert!(matches!(category, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_plan_rejects_duplicates_and_empty() {
        let empty = SweepPlan::<u8>::new(vec![]);
        assert!(matches!(empty, Err(Error::InvalidConfig { .. })));

        let a = Category::new("a", vec![1u8], 1);
        let b = Category::new("a", vec![2u8], 1);
        let (Ok(a), Ok(b)) = (a, b) else {
            return;
        };
        let plan = SweepPlan::new(vec![a, b]);
        assert!(matches!(plan, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_accumulator_averages() {
        let Ok(category) = Category::new("medium", vec![1u8, 2u8], 2) else {
            return;
        };
        let mut acc = category.begin();
        acc.record(&run(10, 100));
        acc.record(&run(20, 200));
        acc.record(&run(30, 300));
        acc.record(&run(40, 400));

        let result = acc.finalize();
        assert!(result.is_ok());
        if let Ok(r) = result {
            assert_eq!(r.category, CategoryId::from("medium"));
            assert_eq!(r.samples, 4);
            assert!((r.avg_wall_seconds - 0.025).abs() < 1e-12);
            assert!((r.avg_peak_resident_bytes - 250.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_finalize_requires_every_run() {
        let Ok(category) = Category::new("large", vec![()], 3) else {
            return;
        };
        let mut acc = category.begin();
        acc.record(&run(1, 1));

        assert_eq!(acc.recorded(), 1);
        assert!(matches!(acc.finalize(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_total_samples() {
        let a = Category::new(1u32, vec![1, 2, 3], 20);
        let b = Category::new(2u32, vec![4], 5);
        let (Ok(a), Ok(b)) = (a, b) else {
            return;
        };
        let plan = SweepPlan::new(vec![a, b]);
        assert_eq!(plan.ok().map(|p| p.total_samples()), Some(65));
    }

    #[test]
    fn test_category_id_serializes_as_string() {
        let json = serde_json::to_string(&CategoryId::from(3u32));
        assert_eq!(json.ok().as_deref(), Some("\"3\""));
    }
}
