//! Plain-text reports for classifier metrics and LLM agreement.

use std::fmt;

use crashcount_ai::MulticlassMetrics;
use crashcount_core::TargetModel;
use crashcount_llm::AgreementReport;

/// Aggregate metrics followed by the confusion table.
pub struct MetricsReport<'a>(pub &'a MulticlassMetrics);

impl fmt::Display for MetricsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = self.0;
        writeln!(f, "=== Classifier metrics ===")?;
        writeln!(f, "  {:<20} {:.4}", "Micro accuracy", metrics.micro_accuracy)?;
        writeln!(f, "  {:<20} {:.4}", "Macro accuracy", metrics.macro_accuracy)?;
        writeln!(f, "  {:<20} {:.4}", "Log loss", metrics.log_loss)?;
        writeln!(f, "  {:<20} {:.4}", "Log loss reduction", metrics.log_loss_reduction)?;
        writeln!(f)?;
        writeln!(f, "{}", metrics.confusion)
    }
}

/// How one model's counts compare with the ground truth.
pub struct AgreementSummary<'a> {
    pub model: TargetModel,
    pub report: &'a AgreementReport,
}

impl fmt::Display for AgreementSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "=== {} ===", self.model)?;
        writeln!(f, "  {:<20} {}", "Records", report.total)?;
        writeln!(
            f,
            "  {:<20} {} ({:.1}%)",
            "Exact",
            report.exact,
            report.accuracy() * 100.0
        )?;
        writeln!(f, "  {:<20} {}", "Over-counted", report.over)?;
        writeln!(f, "  {:<20} {}", "Under-counted", report.under)?;
        writeln!(f, "  {:<20} {:.3}", "Mean abs. error", report.mean_absolute_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashcount_ai::{LabeledExample, NearestCentroidTrainer, Trainer, evaluate};

    #[test]
    fn agreement_lines() {
        let report = AgreementReport {
            total: 4,
            exact: 3,
            over: 1,
            under: 0,
            mean_absolute_error: 0.25,
        };
        let text = AgreementSummary {
            model: TargetModel::Gemma3_4b,
            report: &report,
        }
        .to_string();
        assert!(text.starts_with("=== google/gemma-3-4b ==="));
        assert!(text.contains("3 (75.0%)"));
        assert!(text.contains("0.250"));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn metrics_include_confusion_table() {
        let example = |label: &str, features: Vec<f32>| LabeledExample {
            label: label.to_string(),
            features,
        };
        let train = [example("1", vec![1.0, 0.0]), example("2", vec![0.0, 1.0])];
        let model = NearestCentroidTrainer::default().fit(&train).unwrap();
        let metrics = evaluate(&model, &train).unwrap();

        let text = MetricsReport(&metrics).to_string();
        assert!(text.contains("Micro accuracy       1.0000"));
        assert!(text.contains("PREDICTED"));
        assert!(text.contains("Precision"));
        assert!(text.starts_with("=== Classifier metrics ===\n"));
        assert!(text.ends_with('\n'));
    }
}
