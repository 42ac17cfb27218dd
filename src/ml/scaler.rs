#![allow(dead_code)]
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Min-max parameters fitted on the training slice only. Immutable once
/// produced; persisted in the model artifact so inference on new raw data
/// can reuse the exact training-time transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    min: f64,
    max: f64,
}

impl ScalingParams {
    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn transform(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| (v - self.min) / self.range()).collect()
    }

    pub fn inverse_transform(&self, scaled: &[f64]) -> Vec<f64> {
        scaled.iter().map(|s| s * self.range() + self.min).collect()
    }
}

/// Linear `[0, 1]` normalization with a stateful fit guard. Fitting twice
/// or transforming before fitting is a hard error, so test data can never
/// leak into the parameters by accident.
#[derive(Debug, Clone, Default)]
pub struct MinMaxScaler {
    params: Option<ScalingParams>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on the training slice. Errors on empty or non-finite input,
    /// on a constant slice (zero range), and on any second fit.
    pub fn fit(&mut self, train_values: &[f64]) -> Result<ScalingParams, ForecastError> {
        if self.params.is_some() {
            return Err(ForecastError::DataValidation(
                "scaler already fitted; refitting would leak evaluation data".to_string(),
            ));
        }
        if train_values.is_empty() {
            return Err(ForecastError::DataValidation(
                "cannot fit scaler on empty training slice".to_string(),
            ));
        }
        if train_values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataValidation(
                "training slice contains non-finite values".to_string(),
            ));
        }

        let min = train_values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = train_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        if max == min {
            return Err(ForecastError::DegenerateScale { value: min });
        }

        let params = ScalingParams { min, max };
        self.params = Some(params);
        Ok(params)
    }

    pub fn params(&self) -> Option<&ScalingParams> {
        self.params.as_ref()
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ForecastError> {
        let params = self.fitted()?;
        Ok(params.transform(values))
    }

    pub fn inverse_transform(&self, scaled: &[f64]) -> Result<Vec<f64>, ForecastError> {
        let params = self.fitted()?;
        Ok(params.inverse_transform(scaled))
    }

    fn fitted(&self) -> Result<&ScalingParams, ForecastError> {
        self.params.as_ref().ok_or_else(|| {
            ForecastError::DataValidation("scaler used before fitting".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_maps_into_unit_interval() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&[10.0, 20.0, 15.0]).unwrap();
        let scaled = scaler.transform(&[10.0, 15.0, 20.0]).unwrap();
        assert_eq!(scaled, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_round_trip() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&[3.0, 9.5, 7.2, 4.4]).unwrap();
        let values = vec![3.0, 4.1, 6.6, 9.5];
        let back = scaler
            .inverse_transform(&scaler.transform(&values).unwrap())
            .unwrap();
        for (v, b) in values.iter().zip(back.iter()) {
            assert!((v - b).abs() < 1e-12, "{} vs {}", v, b);
        }
    }

    #[test]
    fn test_test_slice_uses_train_params() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&[0.0, 10.0]).unwrap();
        // Values outside the training range extrapolate past [0, 1]
        let scaled = scaler.transform(&[20.0]).unwrap();
        assert_eq!(scaled, vec![2.0]);
    }

    #[test]
    fn test_constant_training_slice_is_degenerate() {
        let mut scaler = MinMaxScaler::new();
        let err = scaler.fit(&[5.0, 5.0, 5.0]).unwrap_err();
        assert!(matches!(err, ForecastError::DegenerateScale { value } if value == 5.0));
    }

    #[test]
    fn test_refit_is_rejected() {
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&[1.0, 2.0]).unwrap();
        let err = scaler.fit(&[3.0, 4.0]).unwrap_err();
        assert!(matches!(err, ForecastError::DataValidation(_)));
    }

    #[test]
    fn test_unfitted_transform_is_rejected() {
        let scaler = MinMaxScaler::new();
        assert!(scaler.transform(&[1.0]).is_err());
        assert!(scaler.inverse_transform(&[0.5]).is_err());
    }

    #[test]
    fn test_empty_fit_is_rejected() {
        let mut scaler = MinMaxScaler::new();
        assert!(scaler.fit(&[]).is_err());
    }
}
