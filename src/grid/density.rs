//! Population-density raster: x = longitude, y = latitude, z = people per raster unit area.

use crate::geo::Coordinates;
use crate::grid::interpolant::SparseGridInterpolant;

/// People per km² to people per m².
pub const PER_KM2_TO_PER_M2: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct DensityRaster {
    grid: SparseGridInterpolant,
    scale: f64,
}

impl DensityRaster {
    /// `scale` converts raster values to people per m².
    pub fn new(grid: SparseGridInterpolant, scale: f64) -> Self {
        Self { grid, scale }
    }

    pub fn per_km2(grid: SparseGridInterpolant) -> Self {
        Self::new(grid, PER_KM2_TO_PER_M2)
    }

    pub fn grid(&self) -> &SparseGridInterpolant {
        &self.grid
    }

    /// People per m². Points off the raster hold nobody.
    pub fn density_at(&self, point: Coordinates) -> f64 {
        self.grid
            .interpolate(point.longitude, point.latitude)
            .value_or(0.0)
            * self.scale
    }
}
