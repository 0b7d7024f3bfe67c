//! Flat CSV export of time series and sweep tables.

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SimError;

/// Serialize `rows` as CSV with a header row
pub fn write_csv<W, T>(writer: W, rows: &[T]) -> Result<(), SimError>
where
    W: Write,
    T: Serialize,
{
    let mut csv = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write `rows` to a file, creating parent directories as needed
pub fn write_csv_file<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), SimError> {
    let io_err = |source| SimError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    write_csv(file, rows)
}
