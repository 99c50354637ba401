//! Error taxonomy. Configuration and parse errors abort a run before any sampling;
//! estimate errors abort the run at the offending sample.
//! Out-of-bounds grid lookups are not errors, see [crate::grid::Interpolation].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("at least one source is required")]
    NoSources,
    #[error("total yield must be positive, got {0}")]
    NonPositiveTotalYield(f64),
    #[error("source yield must be positive, got {0} kt")]
    NonPositiveYield(f64),
    #[error("grid axis {axis} needs at least 2 distinct coordinates, found {count}")]
    DegenerateAxis { axis: char, count: usize },
    #[error("invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed delimited text: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: expected at least {expected} columns, found {found}")]
    TooFewColumns {
        row: u64,
        expected: usize,
        found: usize,
    },
    #[error("row {row}, column '{column}': '{value}' is not a number")]
    InvalidNumber {
        row: u64,
        column: String,
        value: String,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(
        "importance density is zero at sample {sample} ({latitude}, {longitude}); sampler and density disagree"
    )]
    ZeroImportanceDensity {
        sample: usize,
        latitude: f64,
        longitude: f64,
    },
    #[error("integrand term is not finite at sample {sample}")]
    NonFiniteTerm { sample: usize },
}

/// Everything that can stop a scenario run from the command line.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error("failed to parse scenario config {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}
