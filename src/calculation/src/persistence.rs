//! Reading and writing trajectories.
//!
//! Three formats are supported:
//!
//! - **JSON database**: every labeled run of a [`TrajectoryDatabase`] as a
//!   list of `[x, y, theta, vx, vy, omega]` arrays, pretty printed with four
//!   space indentation.
//! - **CSV**: one run per file with a time column, read and written through
//!   polars.
//! - **Segment text**: `x y theta` per line, the compact format used for
//!   quick plotting with external tools. Values are written at full
//!   precision (shortest representation that reads back exactly), not
//!   rounded to a fixed number of digits.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use polars::prelude::*;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::error::{CalcError, Result};
use crate::state::State;
use crate::trajectory::{Trajectory, TrajectoryDatabase};

/// Name of the time column in CSV files.
pub const TIME_COLUMN: &str = "t";

/// Write the database as indented JSON.
pub fn write_json<W: Write>(db: &TrajectoryDatabase, writer: W) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
    db.serialize(&mut ser)?;
    Ok(())
}

/// Write the database as indented JSON to `path`.
pub fn save_json(db: &TrajectoryDatabase, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_json(db, &mut writer)?;
    writer.flush()?;
    info!(path = %path.display(), runs = db.len(), "trajectory database saved");
    Ok(())
}

/// Read a database written by [`write_json`].
pub fn read_json<R: Read>(reader: R) -> Result<TrajectoryDatabase> {
    Ok(serde_json::from_reader(reader)?)
}

/// Read a database from a JSON file.
pub fn load_json(path: impl AsRef<Path>) -> Result<TrajectoryDatabase> {
    let path = path.as_ref();
    let db = read_json(BufReader::new(File::open(path)?))?;
    debug!(path = %path.display(), runs = db.len(), "trajectory database loaded");
    Ok(db)
}

/// Tabular view of a trajectory: `t, x, y, theta, vx, vy, omega`.
pub fn trajectory_frame(trajectory: &Trajectory, dt: f64) -> Result<DataFrame> {
    let states = trajectory.to_array();
    let mut columns = Vec::with_capacity(State::LEN + 1);
    columns.push(Series::new(TIME_COLUMN, trajectory.times(dt)));
    for (j, name) in State::FIELDS.iter().enumerate() {
        columns.push(Series::new(name, states.column(j).to_vec()));
    }
    Ok(DataFrame::new(columns)?)
}

/// Write one trajectory to a CSV file with a header row.
pub fn write_csv(trajectory: &Trajectory, dt: f64, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut df = trajectory_frame(trajectory, dt)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).has_header(true).finish(&mut df)?;
    debug!(path = %path.display(), rows = df.height(), "trajectory csv written");
    Ok(())
}

/// Read a trajectory from a CSV file. The time column is optional; the six
/// state columns are required, in any order.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Trajectory> {
    let file = File::open(path.as_ref())?;
    let df = CsvReader::new(file).has_header(true).finish()?;

    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(State::LEN);
    for name in State::FIELDS {
        let series = df
            .column(name)
            .map_err(|_| CalcError::MissingColumn(name.to_string()))?
            .cast(&DataType::Float64)?;
        let values = series
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        columns.push(values);
    }

    Ok((0..df.height())
        .map(|i| {
            State::new(
                columns[0][i],
                columns[1][i],
                columns[2][i],
                columns[3][i],
                columns[4][i],
                columns[5][i],
            )
        })
        .collect())
}

/// Write `x y theta` lines, one per state.
pub fn write_segment<W: Write>(trajectory: &Trajectory, mut writer: W) -> Result<()> {
    for state in trajectory {
        writeln!(writer, "{} {} {}", state.x, state.y, state.theta)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a segment file to `path`.
pub fn save_segment(trajectory: &Trajectory, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    write_segment(trajectory, BufWriter::new(File::create(path)?))?;
    debug!(path = %path.display(), "trajectory segment written");
    Ok(())
}
