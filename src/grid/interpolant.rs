//! Bilinear interpolation over an irregular, axis-sorted sparse grid.
//!
//! Only nonzero cells are stored; every other vertex of the rectilinear lattice spanned by the
//! distinct x and y coordinates reads as zero. Queries outside the lattice bounds yield
//! [Interpolation::NoData] rather than an error so each caller can state its own policy.

use std::collections::{BTreeSet, HashMap};

use crate::error::ConfigError;

/// Result of a grid lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpolation {
    Value(f64),
    NoData,
}

impl Interpolation {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::NoData => None,
        }
    }

    pub fn value_or(self, fallback: f64) -> f64 {
        self.value().unwrap_or(fallback)
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// f64 keys for the sparse store. `-0.0` and `0.0` map to the same key.
fn key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

#[derive(Debug, Clone)]
pub struct SparseGridInterpolant {
    cells: HashMap<u64, HashMap<u64, f64>>,
    x_coordinates: Vec<f64>,
    y_coordinates: Vec<f64>,
}

/// Incrementally collects (x, y, z) points, then freezes them into a [SparseGridInterpolant].
#[derive(Debug, Default)]
pub struct SparseGridBuilder {
    cells: HashMap<u64, HashMap<u64, f64>>,
    x_coordinates: BTreeSet<u64>,
    y_coordinates: BTreeSet<u64>,
}

/// Total-order wrapper so BTreeSet sorts by numeric value.
fn ordered_bits(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits | (1 << 63)
    }
}

fn from_ordered_bits(bits: u64) -> f64 {
    if bits >> 63 == 1 {
        f64::from_bits(bits & !(1 << 63))
    } else {
        f64::from_bits(!bits)
    }
}

impl SparseGridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers both coordinates; the value is only stored when nonzero.
    /// A later point at the same vertex overwrites an earlier one.
    pub fn insert(&mut self, x: f64, y: f64, z: f64) {
        let (x, y) = (if x == 0.0 { 0.0 } else { x }, if y == 0.0 { 0.0 } else { y });
        self.x_coordinates.insert(ordered_bits(x));
        self.y_coordinates.insert(ordered_bits(y));
        let column = self.cells.entry(key(x)).or_default();
        if z == 0.0 {
            column.remove(&key(y));
        } else {
            column.insert(key(y), z);
        }
    }

    pub fn build(self) -> Result<SparseGridInterpolant, ConfigError> {
        let x_coordinates: Vec<f64> = self.x_coordinates.into_iter().map(from_ordered_bits).collect();
        let y_coordinates: Vec<f64> = self.y_coordinates.into_iter().map(from_ordered_bits).collect();
        if x_coordinates.len() < 2 {
            return Err(ConfigError::DegenerateAxis {
                axis: 'x',
                count: x_coordinates.len(),
            });
        }
        if y_coordinates.len() < 2 {
            return Err(ConfigError::DegenerateAxis {
                axis: 'y',
                count: y_coordinates.len(),
            });
        }
        let mut cells = self.cells;
        cells.retain(|_, column| !column.is_empty());
        Ok(SparseGridInterpolant {
            cells,
            x_coordinates,
            y_coordinates,
        })
    }
}

/// Bracketing pair around `v` in a sorted axis. Both ends are equal when `v` is a stored
/// coordinate. Caller guarantees `v` lies within the axis bounds.
fn bracket(axis: &[f64], v: f64) -> (f64, f64) {
    let upper = axis.partition_point(|&c| c < v);
    let hi = axis[upper];
    if hi == v {
        (hi, hi)
    } else {
        (axis[upper - 1], hi)
    }
}

/// Linear blend between values at `lo` and `hi`, reading `at_lo` directly when the bracket collapses.
fn lerp(lo: f64, hi: f64, v: f64, at_lo: f64, at_hi: f64) -> f64 {
    if lo == hi {
        return at_lo;
    }
    let span = hi - lo;
    (hi - v) / span * at_lo + (v - lo) / span * at_hi
}

impl SparseGridInterpolant {
    /// Builds a grid from (x, y, z) triples.
    pub fn from_points<I>(points: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let mut builder = SparseGridBuilder::new();
        for (x, y, z) in points {
            builder.insert(x, y, z);
        }
        builder.build()
    }

    pub fn min_x(&self) -> f64 {
        self.x_coordinates[0]
    }

    pub fn max_x(&self) -> f64 {
        self.x_coordinates[self.x_coordinates.len() - 1]
    }

    pub fn min_y(&self) -> f64 {
        self.y_coordinates[0]
    }

    pub fn max_y(&self) -> f64 {
        self.y_coordinates[self.y_coordinates.len() - 1]
    }

    pub fn x_coordinates(&self) -> &[f64] {
        &self.x_coordinates
    }

    pub fn y_coordinates(&self) -> &[f64] {
        &self.y_coordinates
    }

    /// Number of explicitly stored (nonzero) cells.
    pub fn stored_cells(&self) -> usize {
        self.cells.values().map(HashMap::len).sum()
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x() && x <= self.max_x() && y >= self.min_y() && y <= self.max_y()
    }

    /// Stored value at an exact vertex, zero when absent.
    pub fn vertex(&self, x: f64, y: f64) -> f64 {
        self.cells
            .get(&key(x))
            .and_then(|column| column.get(&key(y)))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn interpolate(&self, x: f64, y: f64) -> Interpolation {
        // NaN fails every comparison and lands here too.
        if !self.contains(x, y) {
            return Interpolation::NoData;
        }
        let (x1, x2) = bracket(&self.x_coordinates, x);
        let (y1, y2) = bracket(&self.y_coordinates, y);

        let at_y1 = lerp(x1, x2, x, self.vertex(x1, y1), self.vertex(x2, y1));
        if y1 == y2 {
            return Interpolation::Value(at_y1);
        }
        let at_y2 = lerp(x1, x2, x, self.vertex(x1, y2), self.vertex(x2, y2));
        Interpolation::Value(lerp(y1, y2, y, at_y1, at_y2))
    }
}
