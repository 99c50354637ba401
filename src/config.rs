//! Scenario settings loaded from YAML. Every field has a default except the physics table path,
//! which only the `estimate` command requires.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blast::{DamageStep, OverpressureCombination, StepDamage};
use crate::error::{ConfigError, ParseError, ScenarioError};
use crate::geo::{Planet, EARTH_RADIUS_M};
use crate::grid::{GridLayout, PER_KM2_TO_PER_M2};
use crate::integrator::{EstimateOptions, DEFAULT_BATCHES, DEFAULT_SAMPLE_COUNT};
use crate::parallel::WorkerPool;
use crate::sampling::EngineKind;

/// Environment variable naming a default scenario file.
pub const CONFIG_ENV_VAR: &str = "BLASTMC_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// 1 kt table of log10(psi) by scaled distance and scaled height of burst (feet / kt^(1/3)).
    pub physics_table: Option<PathBuf>,
    pub physics_table_has_index: bool,
    pub density_has_index: bool,
    /// Multiplier from raster units to people per m².
    pub density_scale: f64,
    pub sample_count: usize,
    pub seed: u64,
    pub engine: EngineKind,
    pub sd_scaling_factor: f64,
    pub planet_radius_m: f64,
    pub combination: OverpressureCombination,
    /// Replaces the reference dose-response table when set.
    pub damage_thresholds: Option<Vec<DamageStep>>,
    /// Worker threads; 0 uses every core.
    pub workers: usize,
    /// Independent sample streams. 0 runs sequentially on one stream.
    pub batches: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            physics_table: None,
            physics_table_has_index: true,
            density_has_index: false,
            density_scale: PER_KM2_TO_PER_M2,
            sample_count: DEFAULT_SAMPLE_COUNT,
            seed: 1,
            engine: EngineKind::Pseudorandom,
            sd_scaling_factor: 1.0,
            planet_radius_m: EARTH_RADIUS_M,
            combination: OverpressureCombination::Maximum,
            damage_thresholds: None,
            workers: 0,
            batches: 0,
        }
    }
}

impl ScenarioConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw).map_err(|source| ScenarioError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then [CONFIG_ENV_VAR], then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ScenarioError> {
        match explicit {
            Some(path) => Self::load(path),
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(path) => Self::load(PathBuf::from(path)),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: String| ConfigError::InvalidSetting { name, reason };
        if self.sample_count == 0 {
            return Err(invalid("sample_count", "must be at least 1".to_string()));
        }
        if !(self.sd_scaling_factor > 0.0) || !self.sd_scaling_factor.is_finite() {
            return Err(invalid(
                "sd_scaling_factor",
                format!("must be positive, got {}", self.sd_scaling_factor),
            ));
        }
        if !(self.planet_radius_m > 0.0) || !self.planet_radius_m.is_finite() {
            return Err(invalid(
                "planet_radius_m",
                format!("must be positive, got {}", self.planet_radius_m),
            ));
        }
        if !(self.density_scale >= 0.0) || !self.density_scale.is_finite() {
            return Err(invalid(
                "density_scale",
                format!("must be non-negative, got {}", self.density_scale),
            ));
        }
        self.damage()?;
        Ok(())
    }

    pub fn damage(&self) -> Result<StepDamage, ConfigError> {
        match &self.damage_thresholds {
            Some(steps) => StepDamage::new(steps.clone()),
            None => Ok(StepDamage::reference()),
        }
    }

    pub fn planet(&self) -> Planet {
        Planet::new(self.planet_radius_m)
    }

    pub fn physics_layout(&self) -> GridLayout {
        GridLayout {
            has_leading_index: self.physics_table_has_index,
        }
    }

    pub fn density_layout(&self) -> GridLayout {
        GridLayout {
            has_leading_index: self.density_has_index,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.batches > 0
    }

    pub fn worker_pool(&self) -> WorkerPool {
        WorkerPool::with_workers(self.workers)
    }

    pub fn estimate_options(&self) -> EstimateOptions {
        EstimateOptions {
            sample_count: self.sample_count,
            seed: self.seed,
            engine: self.engine,
            sd_scaling_factor: self.sd_scaling_factor,
            combination: self.combination,
            batches: if self.batches == 0 { DEFAULT_BATCHES } else { self.batches },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ScenarioConfig::from_yaml_str("{}").expect("yaml");
        assert_eq!(config, ScenarioConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.estimate_options().sample_count, 1000);
    }

    #[test]
    fn parses_every_setting() {
        let raw = r#"
physics_table: data/1kt.csv
physics_table_has_index: false
density_has_index: true
density_scale: 1.0
sample_count: 5000
seed: 42
engine: quasirandom
sd_scaling_factor: 0.5
planet_radius_m: 6371000
combination: independent_union
damage_thresholds:
  - { min_psi: 3.0, fraction: 0.1 }
  - { min_psi: 10.0, fraction: 0.9 }
workers: 4
batches: 8
"#;
        let config = ScenarioConfig::from_yaml_str(raw).expect("yaml");
        assert_eq!(config.physics_table, Some(PathBuf::from("data/1kt.csv")));
        assert_eq!(config.engine, EngineKind::Quasirandom);
        assert_eq!(config.combination, OverpressureCombination::IndependentUnion);
        assert_eq!(config.damage().expect("damage").steps().len(), 2);
        assert_eq!(config.worker_pool(), WorkerPool::with_workers(4));
        assert_eq!(config.estimate_options().batches, 8);
        assert!(config.is_parallel());
        assert!(config.density_layout().has_leading_index);
        assert!(!config.physics_layout().has_leading_index);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(ScenarioConfig::from_yaml_str("samples: 10").is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let zero_samples = ScenarioConfig {
            sample_count: 0,
            ..ScenarioConfig::default()
        };
        assert!(zero_samples.validate().is_err());

        let bad_damage = ScenarioConfig {
            damage_thresholds: Some(vec![DamageStep {
                min_psi: 1.0,
                fraction: 2.0,
            }]),
            ..ScenarioConfig::default()
        };
        assert!(matches!(
            bad_damage.validate(),
            Err(ConfigError::InvalidSetting {
                name: "damage_thresholds",
                ..
            })
        ));
    }
}
