//! Delimited-text grid files: one header row (ignored), then rows of `[index,] x, y, z`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::error::{ParseError, ScenarioError};
use crate::grid::interpolant::{SparseGridBuilder, SparseGridInterpolant};

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridLayout {
    /// Skip a leading index column (e.g. a dataframe row number).
    pub has_leading_index: bool,
}

pub(crate) fn parse_field(record: &csv::StringRecord, index: usize, row: u64, column: &str) -> Result<f64, ParseError> {
    let raw = record.get(index).unwrap_or("").trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidNumber {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Parses grid rows from any reader. `row` numbers in errors are 1-based file lines.
pub fn read_sparse_grid<R: Read>(
    reader: R,
    layout: GridLayout,
) -> Result<SparseGridInterpolant, ScenarioError> {
    let first = usize::from(layout.has_leading_index);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut builder = SparseGridBuilder::new();
    for result in csv_reader.records() {
        let record = result.map_err(ParseError::from)?;
        let row = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < first + 3 {
            return Err(ParseError::TooFewColumns {
                row,
                expected: first + 3,
                found: record.len(),
            }
            .into());
        }
        let x = parse_field(&record, first, row, AXIS_NAMES[0])?;
        let y = parse_field(&record, first + 1, row, AXIS_NAMES[1])?;
        let z = parse_field(&record, first + 2, row, AXIS_NAMES[2])?;
        builder.insert(x, y, z);
    }
    Ok(builder.build()?)
}

pub fn load_sparse_grid(
    path: impl AsRef<Path>,
    layout: GridLayout,
) -> Result<SparseGridInterpolant, ScenarioError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let grid = read_sparse_grid(file, layout)?;
    info!(
        path = %path.display(),
        x_coordinates = grid.x_coordinates().len(),
        y_coordinates = grid.y_coordinates().len(),
        stored_cells = grid.stored_cells(),
        "loaded sparse grid"
    );
    Ok(grid)
}
