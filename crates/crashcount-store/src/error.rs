use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parquet file not found: {0}")]
    ParquetNotFound(PathBuf),

    #[error("missing '{0}' column")]
    MissingColumn(String),

    #[error("null {column} at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("line {line}: could not parse {column} value '{value}'")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
