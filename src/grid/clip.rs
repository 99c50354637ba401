//! Cut a population raster down to a latitude/longitude window before a run.
//!
//! Input rows are `X,Y,Z` (longitude, latitude, value) with a header; the output keeps the same
//! layout and drops every cell outside the window or equal to zero.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;

use crate::error::{ParseError, ScenarioError};
use crate::geo::{BoundingBox, Coordinates};
use crate::grid::loader::parse_field;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipReport {
    pub rows_read: usize,
    pub rows_written: usize,
}

pub fn clip_raster<R: Read, W: Write>(
    input: R,
    output: W,
    window: BoundingBox,
) -> Result<ClipReport, ScenarioError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let headers = reader.headers().map_err(ParseError::from)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(ParseError::MissingColumn(name))
    };
    let (x_col, y_col, z_col) = (column("X")?, column("Y")?, column("Z")?);

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(["X", "Y", "Z"]).map_err(ParseError::from)?;

    let mut report = ClipReport::default();
    for result in reader.records() {
        let record = result.map_err(ParseError::from)?;
        let row = record.position().map(|p| p.line()).unwrap_or(0);
        report.rows_read += 1;
        let longitude = parse_field(&record, x_col, row, "X")?;
        let latitude = parse_field(&record, y_col, row, "Y")?;
        let value = parse_field(&record, z_col, row, "Z")?;
        if value != 0.0 && window.contains(Coordinates::new(latitude, longitude)) {
            writer
                .write_record([longitude.to_string(), latitude.to_string(), value.to_string()])
                .map_err(ParseError::from)?;
            report.rows_written += 1;
        }
    }
    writer.flush().map_err(|source| ScenarioError::Write {
        path: "<clip output>".into(),
        source,
    })?;
    Ok(report)
}

pub fn clip_raster_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    window: BoundingBox,
) -> Result<ClipReport, ScenarioError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let source = File::open(input).map_err(|source| ParseError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let sink = File::create(output).map_err(|source| ScenarioError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    let report = clip_raster(source, sink, window)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows_read = report.rows_read,
        rows_written = report.rows_written,
        "clipped raster"
    );
    Ok(report)
}
