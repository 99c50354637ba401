//! How overpressures from several bursts at one point become a single destruction fraction.

use serde::{Deserialize, Serialize};

use crate::blast::damage::DamageFunction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverpressureCombination {
    /// Damage from the strongest blast only.
    #[default]
    Maximum,
    /// Each blast kills independently: 1 - prod(1 - f(p_i)).
    IndependentUnion,
}

impl OverpressureCombination {
    pub fn destruction_fraction<D>(self, damage: &D, overpressures: &[f64]) -> f64
    where
        D: DamageFunction + ?Sized,
    {
        match self {
            Self::Maximum => {
                let strongest = overpressures.iter().copied().fold(0.0, f64::max);
                damage.destruction_fraction(strongest)
            }
            Self::IndependentUnion => {
                let survival: f64 = overpressures
                    .iter()
                    .map(|&psi| 1.0 - damage.destruction_fraction(psi))
                    .product();
                1.0 - survival
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blast::damage::StepDamage;

    fn approx_eq(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "expected {b}, got {a}");
    }

    #[test]
    fn maximum_uses_strongest_blast() {
        let damage = StepDamage::reference();
        let f = OverpressureCombination::Maximum.destruction_fraction(&damage, &[3.0, 13.0, 0.0]);
        assert_eq!(f, 0.98);
    }

    #[test]
    fn independent_union_compounds_survival() {
        let damage = StepDamage::reference();
        let f = OverpressureCombination::IndependentUnion.destruction_fraction(&damage, &[7.0, 7.0]);
        approx_eq(f, 0.75, 1e-12);
    }

    #[test]
    fn no_blasts_destroy_nothing() {
        let damage = StepDamage::reference();
        for policy in [OverpressureCombination::Maximum, OverpressureCombination::IndependentUnion] {
            assert_eq!(policy.destruction_fraction(&damage, &[]), 0.0);
        }
    }

    #[test]
    fn policies_agree_for_a_single_blast() {
        let damage = StepDamage::reference();
        for psi in [0.5, 2.0, 6.0, 40.0] {
            approx_eq(
                OverpressureCombination::Maximum.destruction_fraction(&damage, &[psi]),
                OverpressureCombination::IndependentUnion.destruction_fraction(&damage, &[psi]),
                1e-12,
            );
        }
    }
}
