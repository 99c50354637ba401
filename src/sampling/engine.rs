//! Uniform random vectors in [0,1)^k from either a seeded pseudorandom stream or a Sobol
//! low-discrepancy sequence. Both can be rewound to their initial state.
//! Deterministic: same seed (or same start index) produces the same sequence.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// Seed for stream `index` of a run seeded with `seed`. One SplitMix64 step, so neighbouring
/// indices give unrelated seeds.
#[inline]
pub fn derive_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed.wrapping_add(index.wrapping_add(1).wrapping_mul(SPLITMIX64_GOLDEN));
    z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
    z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
    z ^ (z >> 31)
}

pub trait UniformSource {
    /// Length of every vector this source produces.
    fn dimension(&self) -> usize;

    /// Fills `out` (length [UniformSource::dimension]) with the next vector.
    fn next_vector(&mut self, out: &mut [f64]);

    /// Rewinds to the state right after construction.
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Pseudorandom,
    Quasirandom,
}

#[derive(Debug, Clone)]
pub struct PseudorandomSource {
    seed: u64,
    dimension: usize,
    rng: ChaCha8Rng,
}

impl PseudorandomSource {
    pub fn new(dimension: usize, seed: u64) -> Self {
        Self {
            seed,
            dimension,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl UniformSource for PseudorandomSource {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn next_vector(&mut self, out: &mut [f64]) {
        for slot in out.iter_mut().take(self.dimension) {
            *slot = self.rng.gen::<f64>();
        }
    }

    fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }
}

const SOBOL_BITS: usize = 32;
const SOBOL_SCALE: f64 = 1.0 / 4_294_967_296.0;

/// Joe & Kuo primitive polynomials and initial direction numbers for dimensions 2..=8:
/// (degree, interior coefficient bits, m_1..m_degree).
const SOBOL_PARAMETERS: [(usize, u32, &[u32]); 7] = [
    (1, 0, &[1]),
    (2, 1, &[1, 3]),
    (3, 1, &[1, 3, 1]),
    (3, 2, &[1, 1, 1]),
    (4, 1, &[1, 1, 3, 3]),
    (4, 4, &[1, 3, 5, 13]),
    (5, 2, &[1, 1, 5, 5, 17]),
];

pub const SOBOL_MAX_DIMENSION: usize = SOBOL_PARAMETERS.len() + 1;

fn direction_numbers(dimension: usize) -> [u32; SOBOL_BITS] {
    let mut v = [0u32; SOBOL_BITS];
    if dimension == 0 {
        for (k, slot) in v.iter_mut().enumerate() {
            *slot = 1 << (SOBOL_BITS - 1 - k);
        }
        return v;
    }
    let (degree, coefficients, initial) = SOBOL_PARAMETERS[dimension - 1];
    for k in 0..SOBOL_BITS {
        v[k] = if k < degree {
            initial[k] << (SOBOL_BITS - 1 - k)
        } else {
            let mut next = v[k - degree] ^ (v[k - degree] >> degree);
            for i in 1..degree {
                if (coefficients >> (degree - 1 - i)) & 1 == 1 {
                    next ^= v[k - i];
                }
            }
            next
        };
    }
    v
}

/// Gray-code Sobol sequence. The all-zero first point is skipped, so the first vector is
/// (0.5, 0.5, ...).
#[derive(Debug, Clone)]
pub struct QuasirandomSource {
    directions: Vec<[u32; SOBOL_BITS]>,
    state: Vec<u32>,
    index: u64,
    start: u64,
}

impl QuasirandomSource {
    pub fn new(dimension: usize) -> Result<Self, ConfigError> {
        Self::starting_at(dimension, 0)
    }

    /// Begins after the first `start` points, as if that many vectors had already been drawn.
    pub fn starting_at(dimension: usize, start: u64) -> Result<Self, ConfigError> {
        if dimension == 0 || dimension > SOBOL_MAX_DIMENSION {
            return Err(ConfigError::InvalidSetting {
                name: "engine",
                reason: format!(
                    "quasirandom engine supports 1 to {SOBOL_MAX_DIMENSION} dimensions, got {dimension}"
                ),
            });
        }
        let mut source = Self {
            directions: (0..dimension).map(direction_numbers).collect(),
            state: vec![0; dimension],
            index: 0,
            start,
        };
        source.seek(start);
        Ok(source)
    }

    fn seek(&mut self, index: u64) {
        // Positions past 2^32 - 1 would need more direction bits; wrap instead.
        let index = index % u64::from(u32::MAX);
        let gray = index ^ (index >> 1);
        for (value, directions) in self.state.iter_mut().zip(&self.directions) {
            *value = directions
                .iter()
                .enumerate()
                .filter(|(bit, _)| (gray >> bit) & 1 == 1)
                .fold(0, |acc, (_, &d)| acc ^ d);
        }
        self.index = index;
    }
}

impl UniformSource for QuasirandomSource {
    fn dimension(&self) -> usize {
        self.directions.len()
    }

    fn next_vector(&mut self, out: &mut [f64]) {
        if self.index + 1 >= u64::from(u32::MAX) {
            self.seek(0);
        }
        let bit = self.index.trailing_ones() as usize;
        for ((value, directions), slot) in self.state.iter_mut().zip(&self.directions).zip(out.iter_mut()) {
            *value ^= directions[bit];
            *slot = f64::from(*value) * SOBOL_SCALE;
        }
        self.index += 1;
    }

    fn reset(&mut self) {
        self.seek(self.start);
    }
}

/// Engine chosen once per run.
#[derive(Debug, Clone)]
pub enum RandomEngine {
    Pseudorandom(PseudorandomSource),
    Quasirandom(QuasirandomSource),
}

impl RandomEngine {
    /// Stream for samples `[start, ..)` of a run. Pseudorandom streams are independent per
    /// `stream` index; quasirandom streams continue the one sequence from `start`.
    pub fn for_stream(
        kind: EngineKind,
        dimension: usize,
        seed: u64,
        stream: u64,
        start: u64,
    ) -> Result<Self, ConfigError> {
        Ok(match kind {
            EngineKind::Pseudorandom => {
                let stream_seed = if stream == 0 { seed } else { derive_seed(seed, stream) };
                Self::Pseudorandom(PseudorandomSource::new(dimension, stream_seed))
            }
            EngineKind::Quasirandom => {
                Self::Quasirandom(QuasirandomSource::starting_at(dimension, start)?)
            }
        })
    }

    pub fn new(kind: EngineKind, dimension: usize, seed: u64) -> Result<Self, ConfigError> {
        Self::for_stream(kind, dimension, seed, 0, 0)
    }
}

impl UniformSource for RandomEngine {
    fn dimension(&self) -> usize {
        match self {
            Self::Pseudorandom(source) => source.dimension(),
            Self::Quasirandom(source) => source.dimension(),
        }
    }

    fn next_vector(&mut self, out: &mut [f64]) {
        match self {
            Self::Pseudorandom(source) => source.next_vector(out),
            Self::Quasirandom(source) => source.next_vector(out),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Pseudorandom(source) => source.reset(),
            Self::Quasirandom(source) => source.reset(),
        }
    }
}
