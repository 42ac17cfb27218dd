#![allow(dead_code)]
use ndarray::{Array1, Array3};

use crate::error::ForecastError;

/// Supervised window pairs built from one scaled slice. Pairs stay in
/// source order, which chronological evaluation depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    inputs: Vec<Vec<f64>>,
    targets: Vec<f64>,
    time_step: usize,
}

impl WindowSet {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Batch of shape `(samples, time_step, 1)` for the regressor
    pub fn to_batch(&self) -> Array3<f64> {
        let mut batch = Array3::zeros((self.inputs.len(), self.time_step, 1));
        for (i, window) in self.inputs.iter().enumerate() {
            for (t, &v) in window.iter().enumerate() {
                batch[[i, t, 0]] = v;
            }
        }
        batch
    }

    pub fn targets_array(&self) -> Array1<f64> {
        Array1::from_vec(self.targets.clone())
    }
}

/// Slide a window of length `time_step` over the series with stride 1,
/// pairing each window with the value immediately following it. For a
/// series of length `L` this emits exactly `L - time_step - 1` pairs;
/// the final element is never used as a window start, matching the
/// one-step-ahead target offset.
pub fn make_windows(series: &[f64], time_step: usize) -> Result<WindowSet, ForecastError> {
    let len = series.len();
    if time_step == 0 || len < 2 || time_step >= len - 1 {
        return Err(ForecastError::InsufficientData { len, time_step });
    }

    let count = len - time_step - 1;
    let mut inputs = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);

    for i in 0..count {
        inputs.push(series[i..i + time_step].to_vec());
        targets.push(series[i + time_step]);
    }

    Ok(WindowSet {
        inputs,
        targets,
        time_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_count_invariant() {
        // L = 8, T = 3 -> 8 - 3 - 1 = 4 windows
        let series: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let windows = make_windows(&series, 3).unwrap();
        assert_eq!(windows.len(), 4);
        for window in windows.inputs() {
            assert_eq!(window.len(), 3);
        }
    }

    #[test]
    fn test_targets_follow_inputs() {
        let series = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let windows = make_windows(&series, 2).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows.inputs()[0], vec![10.0, 11.0]);
        assert_eq!(windows.targets()[0], 12.0);
        assert_eq!(windows.inputs()[2], vec![12.0, 13.0]);
        assert_eq!(windows.targets()[2], 14.0);
    }

    #[test]
    fn test_emission_order_matches_source() {
        let series: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let windows = make_windows(&series, 4).unwrap();
        let starts: Vec<f64> = windows.inputs().iter().map(|w| w[0]).collect();
        let mut sorted = starts.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_time_step_too_large_is_error() {
        let series = vec![1.0, 2.0, 3.0, 4.0];
        // time_step must be < len - 1
        let err = make_windows(&series, 3).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData { len: 4, time_step: 3 }
        ));
        assert!(make_windows(&series, 4).is_err());
    }

    #[test]
    fn test_zero_time_step_is_error() {
        let series = vec![1.0, 2.0, 3.0];
        assert!(make_windows(&series, 0).is_err());
    }

    #[test]
    fn test_batch_shape() {
        let series: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        let windows = make_windows(&series, 3).unwrap();
        let batch = windows.to_batch();
        assert_eq!(batch.shape(), &[6, 3, 1]);
        assert_eq!(batch[[0, 0, 0]], 0.0);
        assert_eq!(batch[[5, 2, 0]], 0.7);
        assert_eq!(windows.targets_array().len(), 6);
    }
}
