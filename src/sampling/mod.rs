pub mod discrete;
pub mod engine;
pub mod importance;
pub mod stats;

pub use discrete::DiscreteDistribution;
pub use engine::{
    derive_seed, EngineKind, PseudorandomSource, QuasirandomSource, RandomEngine, UniformSource,
    SOBOL_MAX_DIMENSION,
};
pub use importance::{gaussian_pdf, ImportanceSampler, MixtureComponent};
pub use stats::RunningStats;
