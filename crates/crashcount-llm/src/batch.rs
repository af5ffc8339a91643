//! Counting over many records and scoring the answers against ground truth.

use crashcount_core::{LanguageModelResult, Record, TargetModel};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::client::{CountClient, LlmError};

/// Ask `model` about each record in turn.
///
/// Requests are strictly sequential. The first failure aborts the batch and
/// discards earlier answers. `on_progress(done, total)` fires after each record.
pub async fn count_records(
    client: &CountClient,
    model: TargetModel,
    records: &[Record],
    mut on_progress: impl FnMut(usize, usize),
) -> Result<Vec<LanguageModelResult>, LlmError> {
    let total = records.len();
    let mut results = Vec::with_capacity(total);

    for (i, record) in records.iter().enumerate() {
        let predicted_count = client.extract_count(&record.summary, model).await?;
        results.push(LanguageModelResult {
            row_number: record.row,
            true_count: record.vehicle_count,
            predicted_count,
        });
        on_progress(i + 1, total);
    }

    info!(%model, records = total, "counting complete");
    Ok(results)
}

/// Seeded sample of `n` records, kept in their original order.
///
/// Returns every record when `n` is at least the record count.
pub fn sample_records(records: &[Record], n: usize, seed: u64) -> Vec<Record> {
    if n >= records.len() {
        return records.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, records.len(), n).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| records[i].clone()).collect()
}

/// How LLM answers compare with the recorded vehicle counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgreementReport {
    pub total: usize,
    pub exact: usize,
    /// Answers above the true count.
    pub over: usize,
    /// Answers below the true count.
    pub under: usize,
    pub mean_absolute_error: f64,
}

impl AgreementReport {
    pub fn from_results(results: &[LanguageModelResult]) -> Self {
        let mut report = Self {
            total: results.len(),
            exact: 0,
            over: 0,
            under: 0,
            mean_absolute_error: 0.0,
        };
        let mut abs_error = 0u64;
        for r in results {
            match r.predicted_count.cmp(&r.true_count) {
                std::cmp::Ordering::Equal => report.exact += 1,
                std::cmp::Ordering::Greater => report.over += 1,
                std::cmp::Ordering::Less => report.under += 1,
            }
            abs_error += r.predicted_count.abs_diff(r.true_count);
        }
        if report.total > 0 {
            report.mean_absolute_error = abs_error as f64 / report.total as f64;
        }
        report
    }

    /// Fraction of exact matches; 0 for an empty report.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.exact as f64 / self.total as f64
        }
    }
}
