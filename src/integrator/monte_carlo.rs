//! Importance-sampled Monte Carlo estimate of expected fatalities.
//!
//! Each sample point `x` drawn from the source mixture `q` contributes
//! `density(x) * destruction(x) * area_per_square_degree(x) / q(x)`; the mean of these terms is
//! an unbiased estimate of the integral of `density * destruction` over the planet's surface.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::blast::{DamageFunction, OverpressureCombination, Source};
use crate::error::{ConfigError, EstimateError};
use crate::geo::{Coordinates, Planet};
use crate::grid::{DensityRaster, SparseGridInterpolant};
use crate::parallel::{batch_ranges, WorkerPool};
use crate::sampling::{EngineKind, ImportanceSampler, RandomEngine, RunningStats};

pub const DEFAULT_SAMPLE_COUNT: usize = 1000;
pub const DEFAULT_BATCHES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateOptions {
    pub sample_count: usize,
    pub seed: u64,
    pub engine: EngineKind,
    /// Widens (>1) or narrows (<1) every sampling kernel.
    pub sd_scaling_factor: f64,
    pub combination: OverpressureCombination,
    /// Number of independent streams for [MonteCarloIntegrator::estimate_parallel].
    pub batches: usize,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            seed: 1,
            engine: EngineKind::default(),
            sd_scaling_factor: 1.0,
            combination: OverpressureCombination::default(),
            batches: DEFAULT_BATCHES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Expected fatalities.
    pub value: f64,
    /// Absent with fewer than two samples.
    pub standard_error: Option<f64>,
    pub samples: u64,
    /// True when a stop request ended the run before `sample_count` samples.
    pub interrupted: bool,
}

impl Estimate {
    fn from_stats(stats: &RunningStats, requested: usize) -> Self {
        Self {
            value: stats.mean(),
            standard_error: stats.standard_error(),
            samples: stats.count(),
            interrupted: stats.count() < requested as u64,
        }
    }
}

/// Read-only pieces shared by every sample of one run.
struct Integrand<'a, D: ?Sized> {
    sources: &'a [Source],
    damage: &'a D,
    density: &'a DensityRaster,
    table: &'a SparseGridInterpolant,
    planet: &'a Planet,
    sampler: &'a ImportanceSampler,
    combination: OverpressureCombination,
}

impl<D: DamageFunction + ?Sized> Integrand<'_, D> {
    fn term(
        &self,
        point: Coordinates,
        sample: usize,
        overpressures: &mut Vec<f64>,
    ) -> Result<f64, EstimateError> {
        let q = self.sampler.density(point);
        if !(q > 0.0) {
            return Err(EstimateError::ZeroImportanceDensity {
                sample,
                latitude: point.latitude,
                longitude: point.longitude,
            });
        }

        overpressures.clear();
        overpressures.extend(
            self.sources
                .iter()
                .map(|source| source.peak_overpressure(point, self.planet, self.table)),
        );
        let destroyed = self
            .combination
            .destruction_fraction(self.damage, &overpressures[..]);
        let people = self.density.density_at(point);
        let term = people * destroyed * self.planet.square_degree_area(point.latitude) / q;
        if !term.is_finite() {
            return Err(EstimateError::NonFiniteTerm { sample });
        }
        Ok(term)
    }

    /// Draws the samples numbered `range` from `engine`, checking `stop` between samples.
    fn run(
        &self,
        engine: &mut RandomEngine,
        range: Range<usize>,
        stop: Option<&AtomicBool>,
    ) -> Result<RunningStats, EstimateError> {
        let mut stats = RunningStats::new();
        let mut overpressures = Vec::with_capacity(self.sources.len());
        for sample in range {
            if stop.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break;
            }
            let point = self.sampler.sample(engine);
            stats.push(self.term(point, sample, &mut overpressures)?);
        }
        Ok(stats)
    }
}

/// Estimates expected fatalities for a scenario. One instance can serve many runs; no state is
/// carried between calls.
#[derive(Debug, Clone)]
pub struct MonteCarloIntegrator<'t> {
    table: &'t SparseGridInterpolant,
    planet: Planet,
    options: EstimateOptions,
}

impl<'t> MonteCarloIntegrator<'t> {
    /// `table` is the 1 kt log10 overpressure table shared by every source.
    pub fn new(
        table: &'t SparseGridInterpolant,
        planet: Planet,
        options: EstimateOptions,
    ) -> Result<Self, ConfigError> {
        if options.sample_count == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "sample_count",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(planet.radius > 0.0) {
            return Err(ConfigError::InvalidSetting {
                name: "planet_radius_m",
                reason: format!("must be positive, got {}", planet.radius),
            });
        }
        Ok(Self {
            table,
            planet,
            options,
        })
    }

    pub fn options(&self) -> &EstimateOptions {
        &self.options
    }

    pub fn planet(&self) -> &Planet {
        &self.planet
    }

    fn prepare(&self, sources: &[Source], density: &DensityRaster) -> Result<ImportanceSampler, ConfigError> {
        let sampler = ImportanceSampler::new(sources, self.options.sd_scaling_factor, &self.planet)?;
        let covered = sources
            .iter()
            .any(|s| density.grid().contains(s.longitude(), s.latitude()));
        if !covered {
            warn!("no source lies inside the density raster; the estimate will likely be zero");
        }
        info!(
            sources = sources.len(),
            samples = self.options.sample_count,
            engine = ?self.options.engine,
            combination = ?self.options.combination,
            seed = self.options.seed,
            "starting estimate"
        );
        Ok(sampler)
    }

    pub fn estimate<D>(
        &self,
        sources: &[Source],
        damage: &D,
        density: &DensityRaster,
    ) -> Result<Estimate, EstimateError>
    where
        D: DamageFunction + ?Sized,
    {
        self.estimate_sequential(sources, damage, density, None)
    }

    /// Like [MonteCarloIntegrator::estimate], but returns early with the samples drawn so far
    /// once `stop` is set.
    pub fn estimate_interruptible<D>(
        &self,
        sources: &[Source],
        damage: &D,
        density: &DensityRaster,
        stop: &AtomicBool,
    ) -> Result<Estimate, EstimateError>
    where
        D: DamageFunction + ?Sized,
    {
        self.estimate_sequential(sources, damage, density, Some(stop))
    }

    fn estimate_sequential<D>(
        &self,
        sources: &[Source],
        damage: &D,
        density: &DensityRaster,
        stop: Option<&AtomicBool>,
    ) -> Result<Estimate, EstimateError>
    where
        D: DamageFunction + ?Sized,
    {
        let sampler = self.prepare(sources, density)?;
        let integrand = self.integrand(sources, damage, density, &sampler);
        let mut engine = RandomEngine::new(self.options.engine, sampler.dimension(), self.options.seed)?;
        let stats = integrand.run(&mut engine, 0..self.options.sample_count, stop)?;
        let estimate = Estimate::from_stats(&stats, self.options.sample_count);
        info!(
            value = estimate.value,
            standard_error = ?estimate.standard_error,
            samples = estimate.samples,
            "estimate complete"
        );
        Ok(estimate)
    }

    /// Splits the run into [EstimateOptions::batches] independent streams on `pool`.
    /// Deterministic for a given batch count, and statistically (not bitwise) equivalent to
    /// [MonteCarloIntegrator::estimate].
    pub fn estimate_parallel<D>(
        &self,
        sources: &[Source],
        damage: &D,
        density: &DensityRaster,
        pool: &WorkerPool,
    ) -> Result<Estimate, EstimateError>
    where
        D: DamageFunction + ?Sized,
    {
        let sampler = self.prepare(sources, density)?;
        let integrand = self.integrand(sources, damage, density, &sampler);
        let ranges = batch_ranges(self.options.sample_count, self.options.batches.max(1));
        let (kind, dimension, seed) = (self.options.engine, sampler.dimension(), self.options.seed);

        let partials = pool.install(|| {
            ranges
                .par_iter()
                .enumerate()
                .map(|(batch, range)| {
                    let mut engine =
                        RandomEngine::for_stream(kind, dimension, seed, batch as u64, range.start as u64)?;
                    let stats = integrand.run(&mut engine, range.clone(), None)?;
                    debug!(batch, samples = stats.count(), mean = stats.mean(), "batch complete");
                    Ok(stats)
                })
                .collect::<Result<Vec<RunningStats>, EstimateError>>()
        })??;

        let stats = partials
            .iter()
            .fold(RunningStats::new(), |acc, partial| acc.merge(partial));
        let estimate = Estimate::from_stats(&stats, self.options.sample_count);
        info!(
            value = estimate.value,
            standard_error = ?estimate.standard_error,
            samples = estimate.samples,
            batches = partials.len(),
            "parallel estimate complete"
        );
        Ok(estimate)
    }

    fn integrand<'a, D: ?Sized>(
        &'a self,
        sources: &'a [Source],
        damage: &'a D,
        density: &'a DensityRaster,
        sampler: &'a ImportanceSampler,
    ) -> Integrand<'a, D> {
        Integrand {
            sources,
            damage,
            density,
            table: self.table,
            planet: &self.planet,
            sampler,
            combination: self.options.combination,
        }
    }
}
