//! Mean and standard deviation over trial samples.

use serde::{Deserialize, Serialize};

/// Mean and sample standard deviation of a metric, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Arithmetic mean
    pub mean: f64,

    /// Sample standard deviation (`n - 1` denominator); 0 for a single sample
    pub std_dev: f64,
}

impl Summary {
    /// Summarize a set of samples.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // sample counts are far below 2^52
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;

        let std_dev = if samples.len() < 2 {
            0.0
        } else {
            let sum_sq = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
            (sum_sq / (n - 1.0)).sqrt()
        };

        Some(Self { mean, std_dev })
    }
}
