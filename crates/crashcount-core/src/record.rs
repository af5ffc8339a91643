//! Accident-report records: the raw Parquet row and the reduced unit of work.

use serde::{Deserialize, Serialize};

use crate::schema::nmvccs;

/// One input unit: row position, narrative summary, and the ground-truth vehicle count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Position of the row in the source dataset.
    pub row: usize,
    pub summary: String,
    /// Total vehicles involved (`NUMTOTV`).
    pub vehicle_count: i64,
}

/// A full row of the NMVCCS extract. Every column is nullable in the export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseRecord {
    pub level_0: Option<i64>,
    pub index: Option<i64>,
    pub scase_id: Option<i64>,
    pub summary_en: Option<String>,
    pub summary_ge: Option<String>,
    pub injsev_a: Option<i64>,
    pub numtotv: Option<i64>,
    pub weather: [Option<i64>; 8],
    pub injsev_b: Option<i64>,
}

impl CaseRecord {
    /// Summary text for the given column name (`SUMMARY_EN` or `SUMMARY_GE`).
    pub fn summary(&self, column: &str) -> Option<&str> {
        match column {
            nmvccs::SUMMARY_EN => self.summary_en.as_deref(),
            nmvccs::SUMMARY_GE => self.summary_ge.as_deref(),
            _ => None,
        }
    }

    /// Reduce to a [`Record`]. Returns `None` when the summary is missing.
    ///
    /// A null `NUMTOTV` counts as zero vehicles.
    pub fn to_record(&self, row: usize, summary_column: &str) -> Option<Record> {
        let summary = self.summary(summary_column)?;
        Some(Record {
            row,
            summary: summary.to_string(),
            vehicle_count: self.numtotv.unwrap_or(0),
        })
    }

    /// Numeric fields in [`nmvccs::table_columns`] order.
    pub fn table_values(&self) -> Vec<Option<i64>> {
        let mut values = vec![self.level_0, self.index, self.scase_id, self.numtotv];
        values.extend(self.weather);
        values.push(self.injsev_a);
        values.push(self.injsev_b);
        values
    }
}
