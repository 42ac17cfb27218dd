use ndarray::{Array1, Array2, Array3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ForecastError;
use crate::ml::{CancelToken, SequenceRegressor, TrainedModel, TrainingConfig, TrainingReport};

pub const KIND: &str = "recurrent";

/// Stacked Elman-style recurrent regressor: `layers` recurrent tanh
/// layers of width `hidden_units`, inverted dropout between layers while
/// training, and a linear output head reading the final hidden state.
/// Trained with mini-batch gradient descent and full backpropagation
/// through time on a squared-error objective.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecurrentRegressor;

impl RecurrentRegressor {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayerWeights {
    /// Input weights (hidden x input_dim); input_dim is 1 for layer 0
    wx: Array2<f64>,
    /// Recurrent weights (hidden x hidden)
    wh: Array2<f64>,
    b: Array1<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecurrentWeights {
    layers: Vec<LayerWeights>,
    w_out: Array1<f64>,
    b_out: f64,
    time_step: usize,
}

impl RecurrentWeights {
    fn init(time_step: usize, config: &TrainingConfig, rng: &mut StdRng) -> Self {
        let hidden = config.hidden_units;
        let mut layers = Vec::with_capacity(config.layers);
        for l in 0..config.layers {
            let input_dim = if l == 0 { 1 } else { hidden };
            layers.push(LayerWeights {
                wx: uniform_matrix(hidden, input_dim, rng),
                wh: uniform_matrix(hidden, hidden, rng),
                b: Array1::zeros(hidden),
            });
        }
        let scale = 1.0 / (hidden as f64).sqrt();
        let w_out = Array1::from_iter((0..hidden).map(|_| rng.gen_range(-scale..scale)));
        Self {
            layers,
            w_out,
            b_out: 0.0,
            time_step,
        }
    }
}

fn uniform_matrix(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
    let scale = 1.0 / (cols as f64).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-scale..scale))
}

/// Per-sample forward activations kept for backpropagation
struct ForwardPass {
    /// Hidden states, `[layer][t]`
    hs: Vec<Vec<Array1<f64>>>,
    /// Post-dropout activations fed to the layer above / output head
    fed: Vec<Vec<Array1<f64>>>,
    prediction: f64,
}

fn forward(
    weights: &RecurrentWeights,
    window: &[f64],
    masks: Option<&[Vec<Array1<f64>>]>,
) -> ForwardPass {
    let n_layers = weights.layers.len();
    let t_len = window.len();
    let mut hs: Vec<Vec<Array1<f64>>> = vec![Vec::with_capacity(t_len); n_layers];
    let mut fed: Vec<Vec<Array1<f64>>> = vec![Vec::with_capacity(t_len); n_layers];

    for l in 0..n_layers {
        let layer = &weights.layers[l];
        let mut h_prev = Array1::zeros(layer.b.len());
        for t in 0..t_len {
            let input: Array1<f64> = if l == 0 {
                Array1::from_vec(vec![window[t]])
            } else {
                fed[l - 1][t].clone()
            };
            let z = layer.wx.dot(&input) + layer.wh.dot(&h_prev) + &layer.b;
            let h = z.mapv(f64::tanh);
            let f = match masks {
                Some(m) => &h * &m[l][t],
                None => h.clone(),
            };
            hs[l].push(h.clone());
            fed[l].push(f);
            h_prev = h;
        }
    }

    let prediction = weights.w_out.dot(&fed[n_layers - 1][t_len - 1]) + weights.b_out;
    ForwardPass {
        hs,
        fed,
        prediction,
    }
}

struct LayerGrad {
    wx: Array2<f64>,
    wh: Array2<f64>,
    b: Array1<f64>,
}

struct Gradients {
    layers: Vec<LayerGrad>,
    w_out: Array1<f64>,
    b_out: f64,
}

impl Gradients {
    fn zeros_like(weights: &RecurrentWeights) -> Self {
        let layers = weights
            .layers
            .iter()
            .map(|l| LayerGrad {
                wx: Array2::zeros(l.wx.raw_dim()),
                wh: Array2::zeros(l.wh.raw_dim()),
                b: Array1::zeros(l.b.raw_dim()),
            })
            .collect();
        Self {
            layers,
            w_out: Array1::zeros(weights.w_out.raw_dim()),
            b_out: 0.0,
        }
    }
}

fn add_outer(target: &mut Array2<f64>, a: &Array1<f64>, b: &Array1<f64>) {
    for i in 0..a.len() {
        for j in 0..b.len() {
            target[[i, j]] += a[i] * b[j];
        }
    }
}

/// Backpropagation through time for one sample, accumulating into `grads`
fn backward(
    weights: &RecurrentWeights,
    window: &[f64],
    masks: &[Vec<Array1<f64>>],
    pass: &ForwardPass,
    target: f64,
    grads: &mut Gradients,
) {
    let n_layers = weights.layers.len();
    let t_len = window.len();
    let top = n_layers - 1;

    // Squared-error loss gradient at the output head
    let dl = 2.0 * (pass.prediction - target);
    grads.w_out.scaled_add(dl, &pass.fed[top][t_len - 1]);
    grads.b_out += dl;

    // Gradient arriving at each hidden state from above (layer l+1 or the
    // output head); the recurrent path is carried separately per layer.
    let mut d_ext: Vec<Vec<Array1<f64>>> = weights
        .layers
        .iter()
        .map(|l| (0..t_len).map(|_| Array1::zeros(l.b.len())).collect())
        .collect();
    {
        let mut d = weights.w_out.clone();
        d *= dl;
        d *= &masks[top][t_len - 1];
        d_ext[top][t_len - 1] = d;
    }

    for l in (0..n_layers).rev() {
        let layer = &weights.layers[l];
        let mut carry: Array1<f64> = Array1::zeros(layer.b.len());
        for t in (0..t_len).rev() {
            let dh = &d_ext[l][t] + &carry;
            let dz = dh * pass.hs[l][t].mapv(|v| 1.0 - v * v);

            grads.layers[l].b += &dz;
            if t > 0 {
                add_outer(&mut grads.layers[l].wh, &dz, &pass.hs[l][t - 1]);
            }
            let input: Array1<f64> = if l == 0 {
                Array1::from_vec(vec![window[t]])
            } else {
                pass.fed[l - 1][t].clone()
            };
            add_outer(&mut grads.layers[l].wx, &dz, &input);

            carry = layer.wh.t().dot(&dz);
            if l > 0 {
                let mut down = layer.wx.t().dot(&dz);
                down *= &masks[l - 1][t];
                d_ext[l - 1][t] += &down;
            }
        }
    }
}

fn dropout_masks(
    n_layers: usize,
    hidden: usize,
    t_len: usize,
    dropout: f64,
    rng: &mut StdRng,
) -> Vec<Vec<Array1<f64>>> {
    let keep = 1.0 - dropout;
    (0..n_layers)
        .map(|_| {
            (0..t_len)
                .map(|_| {
                    if dropout == 0.0 {
                        Array1::ones(hidden)
                    } else {
                        Array1::from_shape_fn(hidden, |_| {
                            if rng.gen::<f64>() < dropout {
                                0.0
                            } else {
                                1.0 / keep
                            }
                        })
                    }
                })
                .collect()
        })
        .collect()
}

fn sample_window(inputs: &Array3<f64>, i: usize) -> Vec<f64> {
    let t_len = inputs.shape()[1];
    (0..t_len).map(|t| inputs[[i, t, 0]]).collect()
}

impl SequenceRegressor for RecurrentRegressor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn fit(
        &self,
        inputs: &Array3<f64>,
        targets: &Array1<f64>,
        config: &TrainingConfig,
        cancel: &CancelToken,
    ) -> Result<(TrainedModel, TrainingReport), ForecastError> {
        config
            .validate()
            .map_err(|errors| ForecastError::DataValidation(errors.join(", ")))?;

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

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut weights = RecurrentWeights::init(t_len, config, &mut rng);

        let mut initial_loss = 0.0;
        let mut final_loss = 0.0;
        let mut epochs_run = 0;

        for epoch in 0..config.epochs {
            if cancel.is_cancelled() {
                return Err(ForecastError::Cancelled);
            }

            let mut epoch_loss = 0.0;
            let mut start = 0;
            while start < n {
                let end = (start + config.batch_size).min(n);
                let mut grads = Gradients::zeros_like(&weights);

                for i in start..end {
                    let window = sample_window(inputs, i);
                    let masks = dropout_masks(
                        config.layers,
                        config.hidden_units,
                        t_len,
                        config.dropout,
                        &mut rng,
                    );
                    let pass = forward(&weights, &window, Some(&masks));
                    epoch_loss += (pass.prediction - targets[i]).powi(2);
                    backward(&weights, &window, &masks, &pass, targets[i], &mut grads);
                }

                let scale = config.learning_rate / (end - start) as f64;
                for (layer, grad) in weights.layers.iter_mut().zip(grads.layers.iter()) {
                    layer.wx.scaled_add(-scale, &grad.wx);
                    layer.wh.scaled_add(-scale, &grad.wh);
                    layer.b.scaled_add(-scale, &grad.b);
                }
                weights.w_out.scaled_add(-scale, &grads.w_out);
                weights.b_out -= scale * grads.b_out;

                start = end;
            }

            epoch_loss /= n as f64;
            if epoch == 0 {
                initial_loss = epoch_loss;
            }
            final_loss = epoch_loss;
            epochs_run = epoch + 1;
            debug!("epoch {}/{}: mse={:.6}", epochs_run, config.epochs, epoch_loss);
        }

        let model = TrainedModel::encode(KIND, &weights)?;
        Ok((
            model,
            TrainingReport {
                samples: n,
                epochs_run,
                initial_loss,
                final_loss,
            },
        ))
    }

    fn predict(
        &self,
        model: &TrainedModel,
        inputs: &Array3<f64>,
    ) -> Result<Array1<f64>, ForecastError> {
        let weights: RecurrentWeights = model.decode(KIND)?;
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

        let mut out = Array1::zeros(n);
        for i in 0..n {
            let window = sample_window(inputs, i);
            out[i] = forward(&weights, &window, None).prediction;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::make_windows;

    fn sine_batch(time_step: usize) -> (Array3<f64>, Array1<f64>) {
        let series: Vec<f64> = (0..60)
            .map(|i| 0.5 + 0.4 * (i as f64 * 0.3).sin())
            .collect();
        let windows = make_windows(&series, time_step).unwrap();
        (windows.to_batch(), windows.targets_array())
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            epochs: 80,
            batch_size: 16,
            learning_rate: 0.05,
            hidden_units: 8,
            layers: 1,
            dropout: 0.0,
            seed: 7,
        }
    }

    #[test]
    fn test_loss_decreases_on_smooth_series() {
        let (inputs, targets) = sine_batch(4);
        let regressor = RecurrentRegressor::new();
        let (_, report) = regressor
            .fit(&inputs, &targets, &small_config(), &CancelToken::new())
            .unwrap();
        assert!(report.final_loss.is_finite());
        assert!(
            report.final_loss < report.initial_loss,
            "loss did not decrease: {} -> {}",
            report.initial_loss,
            report.final_loss
        );
    }

    #[test]
    fn test_predict_output_length() {
        let (inputs, targets) = sine_batch(4);
        let regressor = RecurrentRegressor::new();
        let config = TrainingConfig {
            epochs: 2,
            ..small_config()
        };
        let (model, _) = regressor
            .fit(&inputs, &targets, &config, &CancelToken::new())
            .unwrap();
        let preds = regressor.predict(&model, &inputs).unwrap();
        assert_eq!(preds.len(), targets.len());
        assert!(preds.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_stacked_layers_with_dropout_train() {
        let (inputs, targets) = sine_batch(4);
        let regressor = RecurrentRegressor::new();
        let config = TrainingConfig {
            epochs: 5,
            layers: 2,
            dropout: 0.2,
            ..small_config()
        };
        let (model, report) = regressor
            .fit(&inputs, &targets, &config, &CancelToken::new())
            .unwrap();
        assert_eq!(report.epochs_run, 5);
        assert!(report.final_loss.is_finite());
        assert!(regressor.predict(&model, &inputs).is_ok());
    }

    #[test]
    fn test_training_is_reproducible() {
        let (inputs, targets) = sine_batch(4);
        let regressor = RecurrentRegressor::new();
        let config = TrainingConfig {
            epochs: 3,
            ..small_config()
        };
        let (model_a, _) = regressor
            .fit(&inputs, &targets, &config, &CancelToken::new())
            .unwrap();
        let (model_b, _) = regressor
            .fit(&inputs, &targets, &config, &CancelToken::new())
            .unwrap();
        let preds_a = regressor.predict(&model_a, &inputs).unwrap();
        let preds_b = regressor.predict(&model_b, &inputs).unwrap();
        for (a, b) in preds_a.iter().zip(preds_b.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_cancellation_aborts_fit() {
        let (inputs, targets) = sine_batch(4);
        let regressor = RecurrentRegressor::new();
        let token = CancelToken::new();
        token.cancel();
        let err = regressor
            .fit(&inputs, &targets, &small_config(), &token)
            .unwrap_err();
        assert!(matches!(err, ForecastError::Cancelled));
    }

    #[test]
    fn test_target_length_mismatch() {
        let (inputs, _) = sine_batch(4);
        let targets = Array1::zeros(3);
        let regressor = RecurrentRegressor::new();
        let err = regressor
            .fit(&inputs, &targets, &small_config(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, ForecastError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_predict_rejects_wrong_window_length() {
        let (inputs, targets) = sine_batch(4);
        let regressor = RecurrentRegressor::new();
        let config = TrainingConfig {
            epochs: 1,
            ..small_config()
        };
        let (model, _) = regressor
            .fit(&inputs, &targets, &config, &CancelToken::new())
            .unwrap();
        let (other, _) = sine_batch(6);
        let err = regressor.predict(&model, &other).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ShapeMismatch {
                expected: 4,
                actual: 6
            }
        ));
    }
}
