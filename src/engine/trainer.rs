use chrono::Utc;
use tracing::info;

use crate::engine::results::TrainingOutcome;
use crate::error::ForecastError;
use crate::ml::persistence::{ModelArtifact, ModelStore};
use crate::ml::{make_windows, CancelToken, MinMaxScaler, SequenceRegressor, TrainingConfig};
use crate::types::TimeSeries;

/// Parameters for one training run
#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub time_step: usize,
    pub model_name: String,
    pub training: TrainingConfig,
}

/// Orchestrates the pipeline: chronological split, scaler fit on the
/// train slice only, windowing, model fit, inverse-transform back to
/// original units, persistence. Any failure aborts the run before the
/// artifact is written; there is no partial training state on disk.
pub struct Trainer {
    store: ModelStore,
}

impl Trainer {
    pub fn new(store: ModelStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn run(
        &self,
        series: &TimeSeries,
        regressor: &dyn SequenceRegressor,
        request: &TrainRequest,
        cancel: &CancelToken,
    ) -> Result<TrainingOutcome, ForecastError> {
        // TimeSeries construction already guarantees a non-empty, strictly
        // increasing series; windowing below enforces slice lengths.
        let split = series.split_chronological();
        info!(
            "Chronological split: {} train / {} test points",
            split.train.len(),
            split.test.len()
        );

        let train_values = split.train_values();
        let test_values = split.test_values();

        // Parameters come from the train slice only; the same params
        // transform both slices.
        let mut scaler = MinMaxScaler::new();
        let params = scaler.fit(&train_values)?;
        let train_scaled = scaler.transform(&train_values)?;
        let test_scaled = scaler.transform(&test_values)?;

        let train_windows = make_windows(&train_scaled, request.time_step)?;
        let test_windows = make_windows(&test_scaled, request.time_step)?;
        info!(
            "Windowed with time_step {}: {} train / {} test pairs",
            request.time_step,
            train_windows.len(),
            test_windows.len()
        );

        let train_batch = train_windows.to_batch();
        let test_batch = test_windows.to_batch();

        let (model, report) = regressor.fit(
            &train_batch,
            &train_windows.targets_array(),
            &request.training,
            cancel,
        )?;
        info!(
            "Trained {} on {} samples: mse {:.6} -> {:.6}",
            regressor.kind(),
            report.samples,
            report.initial_loss,
            report.final_loss
        );

        let train_pred_scaled = regressor.predict(&model, &train_batch)?;
        let test_pred_scaled = regressor.predict(&model, &test_batch)?;

        // Back to original units with the training params
        let train_predict = params.inverse_transform(&train_pred_scaled.to_vec());
        let test_predict = params.inverse_transform(&test_pred_scaled.to_vec());
        let y_train = params.inverse_transform(train_windows.targets());
        let y_test = params.inverse_transform(test_windows.targets());

        let artifact = ModelArtifact {
            model,
            scaling: params,
            time_step: request.time_step,
            trained_at: Utc::now(),
            source_points: series.len(),
            report: report.clone(),
        };
        let artifact_path = self.store.save(&artifact, &request.model_name)?;

        Ok(TrainingOutcome {
            test_slice: split.test.to_vec(),
            y_test,
            test_predict,
            y_train,
            train_predict,
            report,
            artifact_path,
        })
    }
}

/// Result of scoring a saved model against new raw data
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    /// True targets in original units, aligned with `predictions`
    pub y_true: Vec<f64>,
    pub predictions: Vec<f64>,
}

/// Run a persisted artifact against a new raw series using the scaling
/// parameters and window size stored with the model.
pub fn infer(
    artifact: &ModelArtifact,
    regressor: &dyn SequenceRegressor,
    series: &TimeSeries,
) -> Result<InferenceOutcome, ForecastError> {
    let values = series.values();
    let scaled = artifact.scaling.transform(&values);
    let windows = make_windows(&scaled, artifact.time_step)?;

    let pred_scaled = regressor.predict(&artifact.model, &windows.to_batch())?;
    let predictions = artifact.scaling.inverse_transform(&pred_scaled.to_vec());
    let y_true = artifact.scaling.inverse_transform(windows.targets());

    Ok(InferenceOutcome {
        y_true,
        predictions,
    })
}
