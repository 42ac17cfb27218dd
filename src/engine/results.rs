use std::path::PathBuf;

use serde::Serialize;

use crate::engine::metrics::EvaluationMetrics;
use crate::error::ForecastError;
use crate::ml::TrainingReport;
use crate::types::PricePoint;

/// Everything a training run produces. True/predicted vectors are plain
/// ordered `Vec<f64>` in original units, aligned index-for-index, so
/// downstream scoring and plotting need no array library.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Raw (non-windowed) test slice of the input series
    pub test_slice: Vec<PricePoint>,
    /// True test targets in original units
    pub y_test: Vec<f64>,
    /// Test predictions in original units
    pub test_predict: Vec<f64>,
    /// True train targets in original units (diagnostic)
    pub y_train: Vec<f64>,
    /// Train predictions in original units (diagnostic)
    pub train_predict: Vec<f64>,
    pub report: TrainingReport,
    pub artifact_path: PathBuf,
}

impl TrainingOutcome {
    /// Pretty print run summary and metrics to console
    pub fn print_summary(&self, metrics: &EvaluationMetrics) {
        println!("\n{}", "=".repeat(60));
        println!("                  TRAINING RESULTS");
        println!("{}", "=".repeat(60));
        println!("Train windows:      {}", self.y_train.len());
        println!("Test windows:       {}", self.y_test.len());
        println!("Epochs run:         {}", self.report.epochs_run);
        println!("Final train loss:   {:.6}", self.report.final_loss);
        println!("Artifact:           {}", self.artifact_path.display());
        println!("{}", "-".repeat(60));
        println!("TEST METRICS");
        for (name, value) in metrics.to_map() {
            println!("  {:<10} {:.4}", name, value);
        }
        println!("{}", "=".repeat(60));
    }

    /// Diagnostic export for the external metrics-serving collaborator
    pub fn export_json(&self, metrics: &EvaluationMetrics) -> Result<String, ForecastError> {
        let export = DiagnosticExport {
            y_test: &self.y_test,
            test_predict: &self.test_predict,
            metrics,
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| ForecastError::persistence(format!("cannot export diagnostics: {}", e)))
    }
}

#[derive(Serialize)]
struct DiagnosticExport<'a> {
    y_test: &'a [f64],
    test_predict: &'a [f64],
    metrics: &'a EvaluationMetrics,
}
