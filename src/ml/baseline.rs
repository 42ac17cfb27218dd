use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::ml::{CancelToken, SequenceRegressor, TrainedModel, TrainingConfig, TrainingReport};

pub const KIND: &str = "baseline";

/// Naive persistence forecast: tomorrow equals today. Predicts the last
/// value of each window. Training only records the expected window
/// length; the point of shipping this is a no-skill floor to compare the
/// recurrent model against.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersistenceBaseline;

impl PersistenceBaseline {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BaselineWeights {
    time_step: usize,
}

impl SequenceRegressor for PersistenceBaseline {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fit(
        &self,
        inputs: &Array3<f64>,
        targets: &Array1<f64>,
        _config: &TrainingConfig,
        cancel: &CancelToken,
    ) -> Result<(TrainedModel, TrainingReport), ForecastError> {
        if cancel.is_cancelled() {
            return Err(ForecastError::Cancelled);
        }

        let (n, t_len, width) = inputs.dim();
        if width != 1 {
            return Err(ForecastError::ShapeMismatch {
                expected: 1,
                actual: width,
            });
        }
        if n != targets.len() {
            return Err(ForecastError::ShapeMismatch {
                expected: n,
                actual: targets.len(),
            });
        }
        if n == 0 {
            return Err(ForecastError::DataValidation(
                "empty training batch".to_string(),
            ));
        }

        let loss = (0..n)
            .map(|i| (inputs[[i, t_len - 1, 0]] - targets[i]).powi(2))
            .sum::<f64>()
            / n as f64;

        let model = TrainedModel::encode(KIND, &BaselineWeights { time_step: t_len })?;
        Ok((
            model,
            TrainingReport {
                samples: n,
                epochs_run: 0,
                initial_loss: loss,
                final_loss: loss,
            },
        ))
    }

    fn predict(
        &self,
        model: &TrainedModel,
        inputs: &Array3<f64>,
    ) -> Result<Array1<f64>, ForecastError> {
        let weights: BaselineWeights = model.decode(KIND)?;
        let (n, t_len, width) = inputs.dim();
        if width != 1 {
            return Err(ForecastError::ShapeMismatch {
                expected: 1,
                actual: width,
            });
        }
        if t_len != weights.time_step {
            return Err(ForecastError::ShapeMismatch {
                expected: weights.time_step,
                actual: t_len,
            });
        }
        Ok(Array1::from_iter((0..n).map(|i| inputs[[i, t_len - 1, 0]])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::make_windows;

    #[test]
    fn test_predicts_last_window_value() {
        let series = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let windows = make_windows(&series, 2).unwrap();
        let batch = windows.to_batch();
        let targets = windows.targets_array();

        let baseline = PersistenceBaseline::new();
        let (model, report) = baseline
            .fit(&batch, &targets, &TrainingConfig::default(), &CancelToken::new())
            .unwrap();
        assert_eq!(report.samples, 3);

        let preds = baseline.predict(&model, &batch).unwrap();
        // Window [0.1, 0.2] -> predicts 0.2
        assert_eq!(preds[0], 0.2);
        assert_eq!(preds[2], 0.4);
    }

    #[test]
    fn test_rejects_wide_feature_batch() {
        let baseline = PersistenceBaseline::new();
        let wide = Array3::zeros((3, 2, 2));
        let targets = Array1::zeros(3);
        let err = baseline
            .fit(&wide, &targets, &TrainingConfig::default(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ShapeMismatch {
                expected: 1,
                actual: 2
            }
        ));

        let narrow = Array3::zeros((3, 2, 1));
        let (model, _) = baseline
            .fit(&narrow, &targets, &TrainingConfig::default(), &CancelToken::new())
            .unwrap();
        let err = baseline.predict(&model, &wide).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ShapeMismatch {
                expected: 1,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_rejects_foreign_model() {
        let alien = TrainedModel::encode("recurrent", &vec![0.0]).unwrap();
        let baseline = PersistenceBaseline::new();
        let batch = Array3::zeros((1, 2, 1));
        assert!(baseline.predict(&alien, &batch).is_err());
    }
}
