//! Dose-response curves: peak overpressure (psi) to the fraction of people killed.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Anything that maps overpressure to a fraction in [0, 1]. Plain closures qualify.
pub trait DamageFunction: Sync {
    fn destruction_fraction(&self, overpressure_psi: f64) -> f64;
}

impl<F> DamageFunction for F
where
    F: Fn(f64) -> f64 + Sync,
{
    fn destruction_fraction(&self, overpressure_psi: f64) -> f64 {
        self(overpressure_psi)
    }
}

/// One step of a [StepDamage] table: from `min_psi` upward (inclusive) the fraction is `fraction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageStep {
    pub min_psi: f64,
    pub fraction: f64,
}

/// Monotonic step function. Below the first threshold nothing is destroyed.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDamage {
    steps: Vec<DamageStep>,
}

impl StepDamage {
    pub fn new(steps: Vec<DamageStep>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSetting {
            name: "damage_thresholds",
            reason,
        };
        for step in &steps {
            if !(0.0..=1.0).contains(&step.fraction) {
                return Err(invalid(format!("fraction {} outside [0, 1]", step.fraction)));
            }
            if !step.min_psi.is_finite() {
                return Err(invalid(format!("threshold {} is not finite", step.min_psi)));
            }
        }
        for pair in steps.windows(2) {
            if pair[1].min_psi <= pair[0].min_psi {
                return Err(invalid("thresholds must be strictly increasing".to_string()));
            }
            if pair[1].fraction < pair[0].fraction {
                return Err(invalid("fractions must not decrease".to_string()));
            }
        }
        Ok(Self { steps })
    }

    /// 2 psi: 5%, 5 psi: 50%, 12 psi: 98%.
    pub fn reference() -> Self {
        Self {
            steps: vec![
                DamageStep {
                    min_psi: 2.0,
                    fraction: 0.05,
                },
                DamageStep {
                    min_psi: 5.0,
                    fraction: 0.5,
                },
                DamageStep {
                    min_psi: 12.0,
                    fraction: 0.98,
                },
            ],
        }
    }

    pub fn steps(&self) -> &[DamageStep] {
        &self.steps
    }
}

impl Default for StepDamage {
    fn default() -> Self {
        Self::reference()
    }
}

impl DamageFunction for StepDamage {
    fn destruction_fraction(&self, overpressure_psi: f64) -> f64 {
        let passed = self
            .steps
            .partition_point(|step| step.min_psi <= overpressure_psi);
        passed
            .checked_sub(1)
            .map_or(0.0, |index| self.steps[index].fraction)
    }
}
