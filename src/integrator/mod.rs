pub mod monte_carlo;

pub use monte_carlo::{
    Estimate, EstimateOptions, MonteCarloIntegrator, DEFAULT_BATCHES, DEFAULT_SAMPLE_COUNT,
};
