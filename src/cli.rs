use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::blast::load_sources;
use crate::config::ScenarioConfig;
use crate::error::{ConfigError, ScenarioError};
use crate::geo::BoundingBox;
use crate::grid::{clip_raster_file, load_sparse_grid, DensityRaster};
use crate::integrator::{Estimate, MonteCarloIntegrator};
use crate::sampling::EngineKind;

const USAGE: &str = "usage: blastmc <estimate|clip>";
const ESTIMATE_USAGE: &str = "usage: blastmc estimate <sources.csv> <density.csv> [--config <scenario.yaml>] [--samples <n>] [--seed <n>] [--output <file>] [--table]";
const CLIP_USAGE: &str =
    "usage: blastmc clip <input.csv> <output.csv> <min_lat> <max_lat> <min_lon> <max_lon>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Estimate,
    Clip,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("estimate") => Some(Command::Estimate),
        Some("clip") => Some(Command::Clip),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Estimate) => handle_estimate(args),
        Some(Command::Clip) => handle_clip(args),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

/// Positional arguments and `--flag value` options after the subcommand.
#[derive(Debug, Default)]
struct EstimateArgs {
    sources: PathBuf,
    density: PathBuf,
    config: Option<PathBuf>,
    samples: Option<usize>,
    seed: Option<u64>,
    output: Option<PathBuf>,
    as_table: bool,
}

fn parse_estimate_args(args: &[String]) -> Result<EstimateArgs, String> {
    let mut positional = Vec::new();
    let mut parsed = EstimateArgs::default();
    let mut rest = args.iter().skip(2);
    while let Some(arg) = rest.next() {
        let mut value = |flag: &str| {
            rest.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--output" => parsed.output = Some(PathBuf::from(value("--output")?)),
            "--samples" => {
                let raw = value("--samples")?;
                parsed.samples = Some(raw.parse().map_err(|_| format!("invalid samples '{raw}'"))?);
            }
            "--seed" => {
                let raw = value("--seed")?;
                parsed.seed = Some(raw.parse().map_err(|_| format!("invalid seed '{raw}'"))?);
            }
            "--table" => parsed.as_table = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    match <[PathBuf; 2]>::try_from(positional) {
        Ok([sources, density]) => {
            parsed.sources = sources;
            parsed.density = density;
            Ok(parsed)
        }
        Err(_) => Err("expected exactly two input paths".to_string()),
    }
}

#[derive(Debug, Serialize)]
struct EstimateReport {
    sources: usize,
    seed: u64,
    engine: EngineKind,
    expected_fatalities: f64,
    standard_error: Option<f64>,
    samples: u64,
    interrupted: bool,
}

fn run_estimate(args: &EstimateArgs) -> Result<EstimateReport, ScenarioError> {
    let mut config = ScenarioConfig::resolve(args.config.as_deref())?;
    if let Some(samples) = args.samples {
        config.sample_count = samples;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;

    let table_path = config
        .physics_table
        .clone()
        .ok_or(ConfigError::InvalidSetting {
            name: "physics_table",
            reason: "a scenario config naming the overpressure table is required".to_string(),
        })?;
    let table = load_sparse_grid(&table_path, config.physics_layout())?;
    let sources = load_sources(&args.sources)?;
    let density = DensityRaster::new(
        load_sparse_grid(&args.density, config.density_layout())?,
        config.density_scale,
    );
    let damage = config.damage()?;

    let integrator = MonteCarloIntegrator::new(&table, config.planet(), config.estimate_options())?;
    let estimate: Estimate = if config.is_parallel() {
        integrator.estimate_parallel(&sources, &damage, &density, &config.worker_pool())?
    } else {
        integrator.estimate(&sources, &damage, &density)?
    };

    Ok(EstimateReport {
        sources: sources.len(),
        seed: config.seed,
        engine: config.engine,
        expected_fatalities: estimate.value,
        standard_error: estimate.standard_error,
        samples: estimate.samples,
        interrupted: estimate.interrupted,
    })
}

fn render_report(report: &EstimateReport, as_table: bool) -> Result<String, ScenarioError> {
    if as_table {
        let standard_error = report
            .standard_error
            .map_or_else(|| "-".to_string(), |se| format!("{se:.6}"));
        Ok(format!(
            "expected_fatalities\tstandard_error\tsamples\n{:.6}\t{}\t{}",
            report.expected_fatalities, standard_error, report.samples
        ))
    } else {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

fn write_output(path: &Path, payload: &str) -> Result<(), ScenarioError> {
    fs::write(path, format!("{payload}\n")).map_err(|source| ScenarioError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn handle_estimate(args: &[String]) -> i32 {
    let parsed = match parse_estimate_args(args) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{ESTIMATE_USAGE}");
            return 2;
        }
    };

    let outcome = run_estimate(&parsed).and_then(|report| {
        let payload = render_report(&report, parsed.as_table)?;
        match &parsed.output {
            Some(path) => write_output(path, &payload),
            None => {
                println!("{payload}");
                Ok(())
            }
        }
    });
    match outcome {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("estimate failed: {err}");
            1
        }
    }
}

fn parse_f64_arg(raw: Option<&String>, name: &str) -> Result<f64, String> {
    let raw = raw.ok_or_else(|| format!("missing {name}"))?;
    raw.parse::<f64>()
        .map_err(|_| format!("invalid {name} '{raw}'"))
}

fn parse_window(args: &[String]) -> Result<BoundingBox, String> {
    Ok(BoundingBox {
        min_latitude: parse_f64_arg(args.get(4), "min_lat")?,
        max_latitude: parse_f64_arg(args.get(5), "max_lat")?,
        min_longitude: parse_f64_arg(args.get(6), "min_lon")?,
        max_longitude: parse_f64_arg(args.get(7), "max_lon")?,
    })
}

fn handle_clip(args: &[String]) -> i32 {
    let (Some(input), Some(output)) = (args.get(2), args.get(3)) else {
        eprintln!("{CLIP_USAGE}");
        return 2;
    };
    let window = match parse_window(args) {
        Ok(window) => window,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{CLIP_USAGE}");
            return 2;
        }
    };

    match clip_raster_file(input, output, window) {
        Ok(report) => {
            println!(
                "clip complete: rows_read={}, rows_written={}, output='{}'",
                report.rows_read, report.rows_written, output
            );
            0
        }
        Err(err) => {
            eprintln!("clip failed: {err}");
            1
        }
    }
}
