pub mod clip;
pub mod density;
pub mod interpolant;
pub mod loader;

pub use clip::{clip_raster, clip_raster_file, ClipReport};
pub use density::{DensityRaster, PER_KM2_TO_PER_M2};
pub use interpolant::{Interpolation, SparseGridBuilder, SparseGridInterpolant};
pub use loader::{load_sparse_grid, read_sparse_grid, GridLayout};
