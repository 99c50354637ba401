//! Weighted choice among a fixed set of outcomes by inverse CDF lookup.

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteDistribution {
    cumulative: Vec<f64>,
}

impl DiscreteDistribution {
    /// Weights need not sum to one; they are normalized here.
    pub fn new(weights: &[f64]) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSetting {
            name: "weights",
            reason,
        };
        if weights.is_empty() {
            return Err(invalid("at least one weight is required".to_string()));
        }
        if let Some(bad) = weights.iter().find(|w| !(**w >= 0.0) || !w.is_finite()) {
            return Err(invalid(format!("must be finite and non-negative, got {bad}")));
        }
        let total: f64 = weights.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(invalid(format!("must sum to a positive finite total, got {total}")));
        }
        let mut running = 0.0;
        let cumulative = weights
            .iter()
            .map(|w| {
                running += w / total;
                running
            })
            .collect();
        Ok(Self { cumulative })
    }

    /// Index whose cumulative mass first exceeds `u`, for `u` in [0, 1).
    pub fn inverse_cdf(&self, u: f64) -> usize {
        let index = self.cumulative.partition_point(|&mass| mass <= u);
        // Rounding can leave the last mass slightly below 1.
        index.min(self.cumulative.len() - 1)
    }
}
