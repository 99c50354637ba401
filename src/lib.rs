//! Expected blast fatalities over a region by importance-sampled Monte Carlo integration of a
//! population-density raster against cube-root-scaled overpressure from one or more bursts.

pub mod blast;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod grid;
pub mod integrator;
pub mod logging;
pub mod parallel;
pub mod sampling;

pub use blast::{DamageFunction, OverpressureCombination, Source, StepDamage};
pub use error::{ConfigError, EstimateError, ParseError, ScenarioError};
pub use geo::{Coordinates, Planet, EARTH};
pub use grid::{DensityRaster, Interpolation, SparseGridInterpolant};
pub use integrator::{Estimate, EstimateOptions, MonteCarloIntegrator};
pub use sampling::{EngineKind, ImportanceSampler};
