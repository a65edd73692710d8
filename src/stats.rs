//! Aggregate statistics over per-image scores.

/// Summary statistics of a series of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of values summarized.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Largest value.
    pub max: f64,
    /// Smallest value.
    pub min: f64,
    /// Median; the mean of the two middle values for even counts.
    pub median: f64,
    /// Sample standard deviation (`n - 1` denominator), `0` for one value.
    pub std_dev: f64,
}

impl Summary {
    /// Summarize `values`, or `None` if there are none.
    ///
    /// The result does not depend on the order of `values`.
    #[must_use]
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        #[allow(clippy::cast_precision_loss)]
        let n = count as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };
        let std_dev = if count > 1 {
            (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            max: sorted[count - 1],
            min: sorted[0],
            median,
            std_dev,
        })
    }
}
