pub mod baseline;
pub mod persistence;
pub mod recurrent;
pub mod scaler;
pub mod windows;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

pub use baseline::PersistenceBaseline;
pub use recurrent::RecurrentRegressor;
pub use scaler::{MinMaxScaler, ScalingParams};
pub use windows::{make_windows, WindowSet};

/// Hyperparameters for one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Recurrent hidden width per layer
    pub hidden_units: usize,
    /// Number of stacked recurrent layers
    pub layers: usize,
    /// Inverted-dropout rate applied between layers during training
    pub dropout: f64,
    /// RNG seed for weight init and dropout masks
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.05,
            hidden_units: 50,
            layers: 2,
            dropout: 0.2,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.epochs == 0 {
            errors.push("epochs must be > 0".to_string());
        }
        if self.batch_size == 0 {
            errors.push("batch_size must be > 0".to_string());
        }
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            errors.push("learning_rate must be positive and finite".to_string());
        }
        if self.hidden_units == 0 {
            errors.push("hidden_units must be > 0".to_string());
        }
        if self.layers == 0 {
            errors.push("layers must be > 0".to_string());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            errors.push("dropout must be in [0, 1)".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Training report after model fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub epochs_run: usize,
    pub initial_loss: f64,
    pub final_loss: f64,
}

/// Opaque trained artifact. The payload is only meaningful to the
/// regressor whose `kind` tag matches; the rest of the pipeline moves it
/// around and persists it without looking inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub kind: String,
    payload: serde_json::Value,
}

impl TrainedModel {
    pub fn encode<T: Serialize>(kind: &str, weights: &T) -> Result<Self, ForecastError> {
        let payload = serde_json::to_value(weights)
            .map_err(|e| ForecastError::persistence(format!("cannot encode model: {}", e)))?;
        Ok(Self {
            kind: kind.to_string(),
            payload,
        })
    }

    /// Decode the payload, checking the kind tag first
    pub fn decode<T: for<'de> Deserialize<'de>>(&self, kind: &str) -> Result<T, ForecastError> {
        if self.kind != kind {
            return Err(ForecastError::Persistence(format!(
                "model kind mismatch: artifact is '{}', regressor is '{}'",
                self.kind, kind
            )));
        }
        serde_json::from_value(self.payload.clone())
            .map_err(|e| ForecastError::persistence(format!("cannot decode model: {}", e)))
    }
}

/// Cooperative cancellation flag checked between training epochs
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Capability interface for a trainable one-step-ahead sequence model.
/// Inputs are batches of shape `(samples, time_step, 1)`; targets are one
/// scalar per sample. The pipeline compiles against any implementation.
pub trait SequenceRegressor {
    /// Tag written into persisted artifacts
    fn kind(&self) -> &'static str;

    /// Train on a window batch; blocking, no partial results
    fn fit(
        &self,
        inputs: &Array3<f64>,
        targets: &Array1<f64>,
        config: &TrainingConfig,
        cancel: &CancelToken,
    ) -> Result<(TrainedModel, TrainingReport), ForecastError>;

    /// Predict one value per window in the batch
    fn predict(&self, model: &TrainedModel, inputs: &Array3<f64>)
        -> Result<Array1<f64>, ForecastError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(TrainingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_config_collects_errors() {
        let config = TrainingConfig {
            epochs: 0,
            learning_rate: -1.0,
            dropout: 1.5,
            ..TrainingConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_trained_model_kind_check() {
        let model = TrainedModel::encode("alpha", &vec![1.0, 2.0]).unwrap();
        assert!(model.decode::<Vec<f64>>("alpha").is_ok());
        let err = model.decode::<Vec<f64>>("beta").unwrap_err();
        assert!(matches!(err, ForecastError::Persistence(_)));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
