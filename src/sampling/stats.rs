//! Streaming mean and variance (Welford), mergeable across independently filled accumulators.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    sum_squares: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: f64) {
        self.count += 1;
        let previous_mean = self.mean;
        self.mean += (sample - previous_mean) / self.count as f64;
        self.sum_squares += (sample - previous_mean) * (sample - self.mean);
    }

    /// Combines two accumulators as if every sample had been pushed into one (Chan et al.).
    pub fn merge(&self, other: &Self) -> Self {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let weight = other.count as f64 / count as f64;
        Self {
            count,
            mean: self.mean + delta * weight,
            sum_squares: self.sum_squares
                + other.sum_squares
                + delta * delta * self.count as f64 * weight,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.sum_squares / (self.count - 1) as f64)
    }

    pub fn population_variance(&self) -> Option<f64> {
        (self.count >= 1).then(|| self.sum_squares / self.count as f64)
    }

    pub fn sample_standard_deviation(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    pub fn standard_error(&self) -> Option<f64> {
        self.sample_standard_deviation()
            .map(|sd| sd / (self.count as f64).sqrt())
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Self::new();
        for sample in iter {
            stats.push(sample);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "expected {b}, got {a}");
    }

    #[test]
    fn matches_textbook_formulas() {
        let stats: RunningStats = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter().collect();
        assert_eq!(stats.count(), 8);
        approx_eq(stats.mean(), 5.0, 1e-12);
        approx_eq(stats.population_variance().expect("n>0"), 4.0, 1e-12);
        approx_eq(stats.sample_variance().expect("n>1"), 32.0 / 7.0, 1e-12);
        approx_eq(
            stats.standard_error().expect("n>1"),
            (32.0f64 / 7.0).sqrt() / 8f64.sqrt(),
            1e-12,
        );
    }

    #[test]
    fn single_sample_has_no_spread_estimate() {
        let stats: RunningStats = [3.0].into_iter().collect();
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.sample_variance(), None);
        assert_eq!(stats.standard_error(), None);
        assert_eq!(RunningStats::new().population_variance(), None);
    }

    #[test]
    fn merge_equals_single_pass() {
        let samples: Vec<f64> = (0..100).map(|i| ((i * 37) % 17) as f64 * 0.5 - 2.0).collect();
        let whole: RunningStats = samples.iter().copied().collect();
        let left: RunningStats = samples[..33].iter().copied().collect();
        let right: RunningStats = samples[33..].iter().copied().collect();
        let merged = left.merge(&right);
        assert_eq!(merged.count(), whole.count());
        approx_eq(merged.mean(), whole.mean(), 1e-12);
        approx_eq(
            merged.sample_variance().expect("n>1"),
            whole.sample_variance().expect("n>1"),
            1e-10,
        );
    }

    #[test]
    fn merging_empty_is_identity() {
        let stats: RunningStats = [1.0, 2.0].into_iter().collect();
        assert_eq!(stats.merge(&RunningStats::new()), stats);
        assert_eq!(RunningStats::new().merge(&stats), stats);
    }
}
