use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Regression metrics computed on original-unit values. `r2` is `None`
/// when the targets have zero variance; `mape` is `None` when every
/// target is zero. Both surface as NaN/null in exports rather than being
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "MSE")]
    pub mse: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "R2 Score")]
    pub r2: Option<f64>,
    #[serde(rename = "MAPE")]
    pub mape: Option<f64>,
    /// Targets equal to zero, excluded from the MAPE mean. For callers
    /// only; the external contract is exactly the five keys above.
    #[serde(skip)]
    pub zero_targets: usize,
}

impl EvaluationMetrics {
    /// The five-key mapping consumed by the external reporting layer.
    /// Undefined values appear explicitly as NaN.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        let mut map = BTreeMap::new();
        map.insert("MAE".to_string(), self.mae);
        map.insert("MSE".to_string(), self.mse);
        map.insert("RMSE".to_string(), self.rmse);
        map.insert("R2 Score".to_string(), self.r2.unwrap_or(f64::NAN));
        map.insert("MAPE".to_string(), self.mape.unwrap_or(f64::NAN));
        map
    }
}

/// Compute MAE/MSE/RMSE/R2/MAPE for equal-length, non-empty slices
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> Result<EvaluationMetrics, ForecastError> {
    if y_true.is_empty() || y_pred.is_empty() {
        return Err(ForecastError::DataValidation(
            "evaluator received an empty input".to_string(),
        ));
    }
    if y_true.len() != y_pred.len() {
        return Err(ForecastError::ShapeMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }

    let n = y_true.len() as f64;

    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut ape_sum = 0.0;
    let mut zero_targets = 0usize;

    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        let err = t - p;
        abs_sum += err.abs();
        sq_sum += err * err;
        if t == 0.0 {
            zero_targets += 1;
        } else {
            ape_sum += (err / t).abs();
        }
    }

    let mae = abs_sum / n;
    let mse = sq_sum / n;
    let rmse = mse.sqrt();

    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let r2 = if ss_tot == 0.0 {
        None
    } else {
        Some(1.0 - sq_sum / ss_tot)
    };

    let nonzero = y_true.len() - zero_targets;
    let mape = if nonzero == 0 {
        None
    } else {
        Some(ape_sum / nonzero as f64)
    };

    Ok(EvaluationMetrics {
        mae,
        mse,
        rmse,
        r2,
        mape,
        zero_targets,
    })
}
