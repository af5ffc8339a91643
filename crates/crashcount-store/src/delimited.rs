//! Shared plumbing for the `;`-delimited text files.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use tempfile::NamedTempFile;
use tracing::info;

use crate::StoreError;

/// Field separator for every file this crate writes.
pub const DELIMITER: u8 = b';';

/// What a skip-if-exists writer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// File was created with this many data rows.
    Written(usize),
    /// File already existed and was left untouched.
    Skipped,
}

/// True when `path` already exists and the write should be skipped.
pub(crate) fn already_written(path: &Path) -> bool {
    let exists = path.exists();
    if exists {
        info!(path = %path.display(), "file exists, skipping write");
    }
    exists
}

/// Write `header` and then every row to `path`, returning the row count.
///
/// Rows go to a temporary file in the same directory, which is renamed onto
/// `path` only after the last row is flushed. If any row fails, the temporary
/// file is removed and `path` is never created.
pub(crate) fn write_table<H, R>(
    path: &Path,
    header: H,
    rows: impl IntoIterator<Item = Result<R, StoreError>>,
) -> Result<usize, StoreError>
where
    H: IntoIterator,
    H::Item: AsRef<[u8]>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(staged);

    writer.write_record(header)?;
    let mut written = 0;
    for row in rows {
        writer.write_record(row?)?;
        written += 1;
    }

    let staged = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;
    staged.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(written)
}

/// Reader that skips the header row and tolerates short rows.
pub(crate) fn open_reader(path: &Path) -> Result<csv::Reader<File>, StoreError> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_path(path)?)
}

/// Parse one field, naming the column and line on failure.
///
/// Rust's numeric parsers are locale-independent: `.` is always the decimal separator.
pub(crate) fn parse_field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
) -> Result<T, StoreError> {
    let value = record.get(index).unwrap_or("");
    value.parse::<T>().map_err(|_| StoreError::Parse {
        line: record.position().map(|p| p.line()).unwrap_or(0),
        column: column.to_string(),
        value: value.to_string(),
    })
}
