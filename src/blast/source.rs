//! Detonation model: cube-root scaled lookup into a 1 kt overpressure table.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{ConfigError, ParseError, ScenarioError};
use crate::geo::{Coordinates, Planet};
use crate::grid::loader::parse_field;
use crate::grid::SparseGridInterpolant;

pub const FEET_PER_METER: f64 = 3.28084;
/// Outer radius of a 1 kt burst at roughly 0.1 psi.
pub const NEGLIGIBLE_EFFECT_DISTANCE_1KT_M: f64 = 9000.0;

const SOURCE_COLUMNS: [&str; 4] = ["latitude", "longitude", "altitude", "yield"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Source {
    pub coordinates: Coordinates,
    /// Meters above ground.
    pub height_of_burst: f64,
    /// Kilotons.
    pub energy_yield: f64,
}

impl Source {
    pub fn new(
        latitude: f64,
        longitude: f64,
        height_of_burst: f64,
        energy_yield: f64,
    ) -> Result<Self, ConfigError> {
        if !(energy_yield > 0.0) {
            return Err(ConfigError::NonPositiveYield(energy_yield));
        }
        if ![latitude, longitude, height_of_burst, energy_yield]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ConfigError::InvalidSetting {
                name: "source",
                reason: format!(
                    "coordinates, altitude and yield must be finite, got ({latitude}, {longitude}, {height_of_burst}, {energy_yield})"
                ),
            });
        }
        Ok(Self {
            coordinates: Coordinates::new(latitude, longitude),
            height_of_burst,
            energy_yield,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates.longitude
    }

    fn yield_scale(&self) -> f64 {
        self.energy_yield.cbrt()
    }

    /// Peak overpressure (psi) at `target`. The table holds log10(psi) indexed by scaled ground
    /// distance and scaled height of burst, both in feet per kt^(1/3). Off-table is zero.
    pub fn peak_overpressure(
        &self,
        target: Coordinates,
        planet: &Planet,
        table: &SparseGridInterpolant,
    ) -> f64 {
        let distance_ft = planet.great_circle_distance(self.coordinates, target) * FEET_PER_METER;
        let scale = self.yield_scale();
        let scaled_distance = distance_ft / scale;
        let scaled_height = self.height_of_burst * FEET_PER_METER / scale;
        table
            .interpolate(scaled_distance, scaled_height)
            .value()
            .map_or(0.0, |log10_psi| 10f64.powf(log10_psi))
    }

    /// Meters. Sizes the importance-sampling kernel only.
    pub fn negligible_effect_radius(&self) -> f64 {
        NEGLIGIBLE_EFFECT_DISTANCE_1KT_M * self.yield_scale()
    }
}

/// Reads a source table with named columns `latitude, longitude, altitude, yield`.
/// Extra columns are ignored and column order is free.
pub fn read_sources<R: Read>(reader: R) -> Result<Vec<Source>, ScenarioError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers().map_err(ParseError::from)?.clone();
    let mut columns = [0usize; 4];
    for (slot, name) in columns.iter_mut().zip(SOURCE_COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(ParseError::MissingColumn(name))?;
    }

    let mut sources = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(ParseError::from)?;
        let row = record.position().map(|p| p.line()).unwrap_or(0);
        let mut values = [0.0; 4];
        for ((value, &index), name) in values.iter_mut().zip(&columns).zip(SOURCE_COLUMNS) {
            *value = parse_field(&record, index, row, name)?;
        }
        let [latitude, longitude, altitude, energy_yield] = values;
        sources.push(Source::new(latitude, longitude, altitude, energy_yield)?);
    }
    Ok(sources)
}

pub fn load_sources(path: impl AsRef<Path>) -> Result<Vec<Source>, ScenarioError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let sources = read_sources(file)?;
    let total_yield: f64 = sources.iter().map(|s| s.energy_yield).sum();
    info!(path = %path.display(), count = sources.len(), total_yield_kt = total_yield, "loaded sources");
    Ok(sources)
}
