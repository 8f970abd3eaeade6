//! Transaction table reading and writing.

use std::fs::File;
use std::path::Path;

use polars::prelude::{CsvReadOptions, CsvWriter, DataFrame, SerReader, SerWriter};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Rows sampled for type inference. Wide enough to see past leading blanks.
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Reads a headed CSV file into a Polars DataFrame.
///
/// Column types are inferred from content; there is no schema file.
pub fn read_csv_table(path: &Path) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read csv table"
    );
    Ok(df)
}

/// Writes a DataFrame as a headed CSV file, replacing any existing file.
pub fn write_csv_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path).map_err(|source| IngestError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .map_err(|e| IngestError::CsvWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "wrote csv table"
    );
    Ok(())
}
