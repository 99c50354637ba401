use std::f64::consts::PI;
use std::sync::atomic::AtomicBool;

use blastmc::blast::{OverpressureCombination, Source, StepDamage, FEET_PER_METER};
use blastmc::geo::EARTH;
use blastmc::grid::{DensityRaster, SparseGridInterpolant};
use blastmc::integrator::{EstimateOptions, MonteCarloIntegrator};
use blastmc::parallel::WorkerPool;
use blastmc::sampling::EngineKind;
use blastmc::{ConfigError, EstimateError};

/// Kill radius of the synthetic table for a 1 kt ground burst.
const KILL_RADIUS_M: f64 = 5_000.0;
/// 1000 people per km².
const DENSITY_PER_M2: f64 = 1e-3;

/// 100 psi (log10 = 2) out to the kill radius, no data beyond.
fn flat_table() -> SparseGridInterpolant {
    let edge_ft = KILL_RADIUS_M * FEET_PER_METER;
    SparseGridInterpolant::from_points([
        (0.0, 0.0, 2.0),
        (edge_ft, 0.0, 2.0),
        (0.0, 100.0, 2.0),
        (edge_ft, 100.0, 2.0),
    ])
    .expect("table")
}

fn uniform_raster() -> DensityRaster {
    let grid = SparseGridInterpolant::from_points([
        (-10.0, -10.0, 1000.0),
        (10.0, -10.0, 1000.0),
        (-10.0, 10.0, 1000.0),
        (10.0, 10.0, 1000.0),
    ])
    .expect("raster");
    DensityRaster::per_km2(grid)
}

fn disc_fatalities(fraction: f64) -> f64 {
    fraction * DENSITY_PER_M2 * PI * KILL_RADIUS_M * KILL_RADIUS_M
}

fn ground_burst(lat: f64, lon: f64) -> Source {
    Source::new(lat, lon, 0.0, 1.0).expect("source")
}

fn options(sample_count: usize, engine: EngineKind) -> EstimateOptions {
    EstimateOptions {
        sample_count,
        engine,
        seed: 17,
        ..EstimateOptions::default()
    }
}

fn assert_close(actual: f64, expected: f64, rel_tol: f64) {
    assert!(
        ((actual - expected) / expected).abs() <= rel_tol,
        "expected {expected} (±{:.1}%), got {actual}",
        rel_tol * 100.0
    );
}

#[test]
fn single_burst_matches_disc_area() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(20_000, EngineKind::Pseudorandom)).expect("integrator");
    let estimate = integrator
        .estimate(&[ground_burst(0.0, 0.0)], &StepDamage::reference(), &uniform_raster())
        .expect("estimate");

    let expected = disc_fatalities(0.98);
    assert_close(estimate.value, expected, 0.06);
    let se = estimate.standard_error.expect("standard error");
    assert!(se > 0.0 && se < 0.05 * expected, "standard error {se}");
    assert_eq!(estimate.samples, 20_000);
    assert!(!estimate.interrupted);
}

#[test]
fn quasirandom_engine_converges_to_the_same_answer() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(8_192, EngineKind::Quasirandom)).expect("integrator");
    let estimate = integrator
        .estimate(&[ground_burst(0.0, 0.0)], &StepDamage::reference(), &uniform_raster())
        .expect("estimate");
    assert_close(estimate.value, disc_fatalities(0.98), 0.05);
}

#[test]
fn separate_bursts_add_up() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(40_000, EngineKind::Pseudorandom)).expect("integrator");
    let sources = [ground_burst(1.0, 1.0), ground_burst(-1.0, -1.0)];
    let estimate = integrator
        .estimate(&sources, &StepDamage::reference(), &uniform_raster())
        .expect("estimate");
    // Both kill discs sit within a degree of the equator, where the area element is ~flat.
    assert_close(estimate.value, 2.0 * disc_fatalities(0.98), 0.06);
}

#[test]
fn identical_inputs_give_bit_identical_estimates() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(2_000, EngineKind::Pseudorandom)).expect("integrator");
    let sources = [ground_burst(0.5, 0.0), Source::new(0.0, 0.5, 200.0, 20.0).expect("source")];
    let raster = uniform_raster();
    let damage = StepDamage::reference();
    let first = integrator.estimate(&sources, &damage, &raster).expect("first");
    let second = integrator.estimate(&sources, &damage, &raster).expect("second");
    assert_eq!(first.value.to_bits(), second.value.to_bits());
    assert_eq!(first, second);
}

#[test]
fn different_seeds_give_different_estimates() {
    let table = flat_table();
    let sources = [ground_burst(0.0, 0.0)];
    let raster = uniform_raster();
    let damage = StepDamage::reference();
    let run = |seed| {
        let options = EstimateOptions {
            seed,
            ..options(500, EngineKind::Pseudorandom)
        };
        MonteCarloIntegrator::new(&table, EARTH, options)
            .expect("integrator")
            .estimate(&sources, &damage, &raster)
            .expect("estimate")
            .value
    };
    assert_ne!(run(1), run(2));
}

#[test]
fn union_policy_scales_overlapping_bursts() {
    let table = flat_table();
    let sources = [ground_burst(0.0, 0.0), ground_burst(0.0, 0.0)];
    let raster = uniform_raster();
    let damage = StepDamage::reference();
    let run = |combination| {
        let options = EstimateOptions {
            combination,
            ..options(4_000, EngineKind::Pseudorandom)
        };
        MonteCarloIntegrator::new(&table, EARTH, options)
            .expect("integrator")
            .estimate(&sources, &damage, &raster)
            .expect("estimate")
            .value
    };
    let strongest = run(OverpressureCombination::Maximum);
    let union = run(OverpressureCombination::IndependentUnion);
    // Same points either way; only the per-point fraction changes.
    assert_close(union / strongest, (1.0 - 0.02 * 0.02) / 0.98, 1e-9);
}

#[test]
fn closures_can_replace_the_damage_table() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(1_000, EngineKind::Pseudorandom)).expect("integrator");
    let sources = [ground_burst(0.0, 0.0)];
    let raster = uniform_raster();
    let everyone = |psi: f64| if psi > 0.0 { 1.0 } else { 0.0 };
    let reference = integrator
        .estimate(&sources, &StepDamage::reference(), &raster)
        .expect("reference");
    let total = integrator.estimate(&sources, &everyone, &raster).expect("closure");
    assert_close(total.value / reference.value, 1.0 / 0.98, 1e-9);
}

#[test]
fn parallel_estimate_is_deterministic_for_a_batch_count() {
    let table = flat_table();
    let options = EstimateOptions {
        batches: 8,
        ..options(16_000, EngineKind::Pseudorandom)
    };
    let integrator = MonteCarloIntegrator::new(&table, EARTH, options).expect("integrator");
    let sources = [ground_burst(0.0, 0.0)];
    let raster = uniform_raster();
    let damage = StepDamage::reference();

    let two = integrator
        .estimate_parallel(&sources, &damage, &raster, &WorkerPool::with_workers(2))
        .expect("two workers");
    let four = integrator
        .estimate_parallel(&sources, &damage, &raster, &WorkerPool::with_workers(4))
        .expect("four workers");
    assert_eq!(two, four);
    assert_eq!(two.samples, 16_000);
    assert_close(two.value, disc_fatalities(0.98), 0.06);
}

#[test]
fn parallel_quasirandom_covers_the_same_points_as_sequential() {
    let table = flat_table();
    let options = EstimateOptions {
        batches: 4,
        ..options(4_096, EngineKind::Quasirandom)
    };
    let integrator = MonteCarloIntegrator::new(&table, EARTH, options).expect("integrator");
    let sources = [ground_burst(0.0, 0.0)];
    let raster = uniform_raster();
    let damage = StepDamage::reference();
    let sequential = integrator.estimate(&sources, &damage, &raster).expect("sequential");
    let parallel = integrator
        .estimate_parallel(&sources, &damage, &raster, &WorkerPool::with_workers(2))
        .expect("parallel");
    assert_close(parallel.value, sequential.value, 1e-9);
}

#[test]
fn stop_flag_ends_the_run_early() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(1_000, EngineKind::Pseudorandom)).expect("integrator");
    let stop = AtomicBool::new(true);
    let estimate = integrator
        .estimate_interruptible(&[ground_burst(0.0, 0.0)], &StepDamage::reference(), &uniform_raster(), &stop)
        .expect("estimate");
    assert_eq!(estimate.samples, 0);
    assert!(estimate.interrupted);
    assert_eq!(estimate.standard_error, None);
}

#[test]
fn no_population_means_no_fatalities() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(500, EngineKind::Pseudorandom)).expect("integrator");
    let estimate = integrator
        .estimate(&[ground_burst(45.0, 45.0)], &StepDamage::reference(), &uniform_raster())
        .expect("estimate");
    assert_eq!(estimate.value, 0.0);
    assert_eq!(estimate.standard_error, Some(0.0));
}

#[test]
fn setup_errors_abort_before_sampling() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(100, EngineKind::Pseudorandom)).expect("integrator");
    let err = integrator
        .estimate(&[], &StepDamage::reference(), &uniform_raster())
        .expect_err("no sources");
    assert_eq!(err, EstimateError::Config(ConfigError::NoSources));

    assert!(MonteCarloIntegrator::new(&table, EARTH, options(0, EngineKind::Pseudorandom)).is_err());
}

#[test]
fn non_finite_damage_is_fatal() {
    let table = flat_table();
    let integrator =
        MonteCarloIntegrator::new(&table, EARTH, options(100, EngineKind::Pseudorandom)).expect("integrator");
    let broken = |_psi: f64| f64::NAN;
    let err = integrator
        .estimate(&[ground_burst(0.0, 0.0)], &broken, &uniform_raster())
        .expect_err("nan damage");
    assert_eq!(err, EstimateError::NonFiniteTerm { sample: 0 });
}

#[test]
fn vanishing_proposal_density_is_fatal() {
    let table = flat_table();
    let options = EstimateOptions {
        sd_scaling_factor: 1e200,
        ..options(100, EngineKind::Pseudorandom)
    };
    let integrator = MonteCarloIntegrator::new(&table, EARTH, options).expect("integrator");
    let err = integrator
        .estimate(&[ground_burst(0.0, 0.0)], &StepDamage::reference(), &uniform_raster())
        .expect_err("density underflow");
    assert!(
        matches!(err, EstimateError::ZeroImportanceDensity { sample: 0, .. }),
        "unexpected error: {err:?}"
    );
}
