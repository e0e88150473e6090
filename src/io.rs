// src/io.rs

//! Matrix, vector and selection files for the command line tool.
//!
//! `.npy` files go through `ndarray-npy`; anything else is read and written as
//! headerless CSV with one matrix row per line.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use ndarray::{Array1, Array2};
use ndarray_npy::{read_npy, write_npy, WriteNpyExt};

fn is_npy(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("npy"))
        .unwrap_or(false)
}

fn invalid_data<E: std::fmt::Display>(path: &Path, err: E) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: {}", path.display(), err),
    )
}

/// Loads a dense matrix from `.npy` or CSV.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> io::Result<Array2<f64>> {
    let path = path.as_ref();
    if is_npy(path) {
        return read_npy(path).map_err(|e| invalid_data(path, e));
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(File::open(path)?));
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for record in rdr.deserialize() {
        let row: Vec<f64> = record.map_err(|e| invalid_data(path, e))?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(invalid_data(
                    path,
                    format!(
                        "row {} has {} entries, expected {}",
                        rows.len() + 1,
                        row.len(),
                        first.len()
                    ),
                ));
            }
        }
        rows.push(row);
    }

    let ncols = rows.first().map_or(0, |r| r.len());
    let nrows = rows.len();
    Array2::from_shape_vec((nrows, ncols), rows.into_iter().flatten().collect())
        .map_err(|e| invalid_data(path, e))
}

/// Saves a 2D ndarray::Array2<f64> as `.npy` or CSV
pub fn write_matrix<P: AsRef<Path>>(matrix: &Array2<f64>, path: P) -> io::Result<()> {
    let path = path.as_ref();
    if is_npy(path) {
        return write_npy(path, matrix).map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    }
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    for row in matrix.rows() {
        wtr.serialize(row.to_vec())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Saves a vector as a 1D `.npy` array or a single CSV line
pub fn write_vector<P: AsRef<Path>>(vector: &[f64], path: P) -> io::Result<()> {
    let path = path.as_ref();
    if is_npy(path) {
        let file = File::create(path)?;
        return Array1::from(vector.to_vec())
            .write_npy(file)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    }
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.serialize(vector)?;
    wtr.flush()?;
    Ok(())
}

/// Writes a selection array as one CSV line of 0/1 flags.
pub fn write_selection<P: AsRef<Path>>(selected: &[bool], path: P) -> io::Result<()> {
    let flags: Vec<u8> = selected.iter().map(|&b| b as u8).collect();
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.serialize(flags)?;
    wtr.flush()?;
    Ok(())
}

/// Reads a selection array; flags may be `0`/`1` or `true`/`false` and may be
/// spread over several lines.
pub fn read_selection<P: AsRef<Path>>(path: P) -> io::Result<Vec<bool>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut selected = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| invalid_data(path, e))?;
        for field in record.iter().filter(|f| !f.is_empty()) {
            let flag = match field.to_ascii_lowercase().as_str() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(invalid_data(path, format!("'{}' is not a selection flag", other)))
                }
            };
            selected.push(flag);
        }
    }
    Ok(selected)
}
