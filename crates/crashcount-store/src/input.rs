//! Parquet reader for the NMVCCS accident-report extract.

use std::path::Path;

use arrow::array::{Array, ArrayRef, Int64Array, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use crashcount_core::{CaseRecord, Record, nmvccs};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::info;

use crate::StoreError;

/// Read all record batches from a Parquet file (any codec, including gzip).
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    if !path.exists() {
        return Err(StoreError::ParquetNotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

/// Read every row of the extract, in file order.
pub fn read_case_records(path: &Path) -> Result<Vec<CaseRecord>, StoreError> {
    let batches = read_parquet(path)?;
    let mut cases = Vec::new();
    for batch in &batches {
        cases.extend(cases_from_batch(batch)?);
    }
    info!(rows = cases.len(), path = %path.display(), "read case records");
    Ok(cases)
}

/// Convert one batch into case records.
///
/// Integer columns may arrive as any numeric Arrow type (pandas writes
/// nullable ints as doubles); they are cast to `Int64`. Absent columns read as null.
pub fn cases_from_batch(batch: &RecordBatch) -> Result<Vec<CaseRecord>, StoreError> {
    let level_0 = int_column(batch, nmvccs::LEVEL_0)?;
    let index = int_column(batch, nmvccs::INDEX)?;
    let scase_id = int_column(batch, nmvccs::SCASEID)?;
    let injsev_a = int_column(batch, nmvccs::INJSEVA)?;
    let numtotv = int_column(batch, nmvccs::NUMTOTV)?;
    let injsev_b = int_column(batch, nmvccs::INJSEVB)?;
    let weather = nmvccs::WEATHER
        .iter()
        .map(|name| int_column(batch, name))
        .collect::<Result<Vec<_>, _>>()?;
    let summary_en = batch.column_by_name(nmvccs::SUMMARY_EN);
    let summary_ge = batch.column_by_name(nmvccs::SUMMARY_GE);

    let cases = (0..batch.num_rows())
        .map(|row| CaseRecord {
            level_0: int_value(&level_0, row),
            index: int_value(&index, row),
            scase_id: int_value(&scase_id, row),
            summary_en: summary_en.and_then(|c| get_string(c.as_ref(), row)),
            summary_ge: summary_ge.and_then(|c| get_string(c.as_ref(), row)),
            injsev_a: int_value(&injsev_a, row),
            numtotv: int_value(&numtotv, row),
            weather: std::array::from_fn(|i| int_value(&weather[i], row)),
            injsev_b: int_value(&injsev_b, row),
        })
        .collect();
    Ok(cases)
}

/// Reduce cases to [`Record`]s, keyed by their position in `cases`.
///
/// `summary_column` must be one of [`nmvccs::SUMMARY_COLUMNS`]. Fails on the
/// first case whose summary is null.
pub fn to_records(cases: &[CaseRecord], summary_column: &str) -> Result<Vec<Record>, StoreError> {
    if !nmvccs::SUMMARY_COLUMNS.contains(&summary_column) {
        return Err(StoreError::MissingColumn(summary_column.to_string()));
    }
    cases
        .iter()
        .enumerate()
        .map(|(row, case)| {
            case.to_record(row, summary_column)
                .ok_or_else(|| StoreError::MissingValue {
                    column: summary_column.to_string(),
                    row,
                })
        })
        .collect()
}

// ── Arrow extraction helpers ──

fn int_column(batch: &RecordBatch, name: &str) -> Result<Option<Int64Array>, StoreError> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let cast: ArrayRef = arrow::compute::cast(col, &DataType::Int64)?;
    Ok(cast.as_any().downcast_ref::<Int64Array>().cloned())
}

fn int_value(col: &Option<Int64Array>, row: usize) -> Option<i64> {
    col.as_ref()
        .filter(|arr| !arr.is_null(row))
        .map(|arr| arr.value(row))
}

/// Extract a string value from an Arrow array (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}
