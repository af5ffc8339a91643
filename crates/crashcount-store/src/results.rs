//! Per-model cache of LLM vehicle counts.

use std::path::PathBuf;

use crashcount_core::{LanguageModelResult, TargetModel};
use tracing::info;

use crate::StoreError;
use crate::delimited::{SaveOutcome, already_written, open_reader, parse_field, write_table};

pub const RESULT_HEADER: [&str; 3] = ["RowNumber", "TrueCount", "PredictedCount"];

/// Directory of `vehicle_counts_<model>.csv` files, one per [`TargetModel`].
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache file for `model`. Distinct models never share a path.
    pub fn path(&self, model: TargetModel) -> PathBuf {
        self.dir
            .join(format!("vehicle_counts_{}.csv", model.cache_suffix()))
    }

    pub fn exists(&self, model: TargetModel) -> bool {
        self.path(model).exists()
    }

    /// Persist results for `model`; a no-op when its file already exists.
    pub fn save(
        &self,
        model: TargetModel,
        results: &[LanguageModelResult],
    ) -> Result<SaveOutcome, StoreError> {
        let path = self.path(model);
        if already_written(&path) {
            return Ok(SaveOutcome::Skipped);
        }

        let rows = write_table(
            &path,
            RESULT_HEADER,
            results.iter().map(|r| {
                Ok([
                    r.row_number.to_string(),
                    r.true_count.to_string(),
                    r.predicted_count.to_string(),
                ])
            }),
        )?;

        info!(model = %model, rows, path = %path.display(), "saved results");
        Ok(SaveOutcome::Written(rows))
    }

    pub fn load(&self, model: TargetModel) -> Result<Vec<LanguageModelResult>, StoreError> {
        let path = self.path(model);
        let mut reader = open_reader(&path)?;
        let mut results = Vec::new();

        for record in reader.records() {
            let record = record?;
            results.push(LanguageModelResult {
                row_number: parse_field(&record, 0, RESULT_HEADER[0])?,
                true_count: parse_field(&record, 1, RESULT_HEADER[1])?,
                predicted_count: parse_field(&record, 2, RESULT_HEADER[2])?,
            });
        }

        info!(model = %model, rows = results.len(), path = %path.display(), "loaded results");
        Ok(results)
    }
}
