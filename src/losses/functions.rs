//! Stateless loss functions
//!
//! Every function takes `(y_true, y_pred)` and returns one value per sample,
//! reducing over the last axis only.

use super::Tensor;
use crate::error::{Error, Result};
use ndarray::{ArrayView1, Axis, IxDyn, Zip};

/// Clipping bound used to keep logarithms and divisions finite
pub const EPSILON: f64 = 1e-7;

const L2_NORM_EPSILON: f64 = 1e-12;

fn ensure_same_shape(y_true: &Tensor, y_pred: &Tensor) -> Result<()> {
    if y_true.shape() != y_pred.shape() {
        return Err(Error::shape(format!(
            "y_true {:?} vs y_pred {:?}",
            y_true.shape(),
            y_pred.shape()
        )));
    }
    if y_pred.ndim() == 0 {
        return Err(Error::shape("loss inputs need at least one axis"));
    }
    Ok(())
}

fn elementwise<F>(y_true: &Tensor, y_pred: &Tensor, f: F) -> Result<Tensor>
where
    F: Fn(f64, f64) -> f64,
{
    ensure_same_shape(y_true, y_pred)?;
    Ok(Zip::from(y_true).and(y_pred).map_collect(|&t, &p| f(t, p)))
}

fn last_axis(tensor: &Tensor) -> Axis {
    Axis(tensor.ndim() - 1)
}

fn mean_last(values: Tensor) -> Tensor {
    values.map_axis(last_axis(&values), |lane| {
        if lane.is_empty() {
            0.0
        } else {
            lane.sum() / lane.len() as f64
        }
    })
}

fn sum_last(values: Tensor) -> Tensor {
    values.map_axis(last_axis(&values), |lane| lane.sum())
}

/// Apply `f` to matching last-axis lanes of both tensors
fn reduce_lanes<F>(y_true: &Tensor, y_pred: &Tensor, f: F) -> Result<Tensor>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64,
{
    ensure_same_shape(y_true, y_pred)?;
    let axis = last_axis(y_pred);
    let values: Vec<f64> = y_true
        .lanes(axis)
        .into_iter()
        .zip(y_pred.lanes(axis))
        .map(|(t, p)| f(t, p))
        .collect();
    let shape = &y_pred.shape()[..y_pred.ndim() - 1];
    Tensor::from_shape_vec(IxDyn(shape), values).map_err(|e| Error::shape(e.to_string()))
}

fn clip(value: f64, low: f64, high: f64) -> f64 {
    value.max(low).min(high)
}

fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

fn log_sum_exp(lane: ArrayView1<f64>) -> f64 {
    let max = lane.fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
    if !max.is_finite() {
        return max;
    }
    max + lane.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

/// Map {0, 1} labels to {-1, 1}; other labels pass through
fn hinge_labels(y_true: &Tensor) -> Tensor {
    if y_true.iter().all(|&t| t == 0.0 || t == 1.0) {
        y_true.mapv(|t| 2.0 * t - 1.0)
    } else {
        y_true.clone()
    }
}

/// Mean of squared differences
pub fn mean_squared_error(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| (p - t).powi(2)).map(mean_last)
}

/// Mean of absolute differences
pub fn mean_absolute_error(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| (p - t).abs()).map(mean_last)
}

/// Mean absolute difference as a percentage of `y_true`
pub fn mean_absolute_percentage_error(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| 100.0 * ((t - p) / t.abs().max(EPSILON)).abs())
        .map(mean_last)
}

/// Mean squared difference of `log(1 + x)`
pub fn mean_squared_logarithmic_error(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| {
        (p.max(EPSILON).ln_1p() - t.max(EPSILON).ln_1p()).powi(2)
    })
    .map(mean_last)
}

/// Negative cosine similarity of the last-axis vectors
pub fn cosine_similarity(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    reduce_lanes(y_true, y_pred, |t, p| {
        let t_norm = t.dot(&t).max(L2_NORM_EPSILON).sqrt();
        let p_norm = p.dot(&p).max(L2_NORM_EPSILON).sqrt();
        -t.dot(&p) / (t_norm * p_norm)
    })
}

/// Logarithm of the hyperbolic cosine of the prediction error
pub fn log_cosh(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| {
        let x = p - t;
        x + softplus(-2.0 * x) - std::f64::consts::LN_2
    })
    .map(mean_last)
}

/// Huber loss with `delta = 1.0`
pub fn huber(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    huber_with(y_true, y_pred, 1.0)
}

/// Huber loss: quadratic below `delta`, linear above
pub fn huber_with(y_true: &Tensor, y_pred: &Tensor, delta: f64) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| {
        let error = (p - t).abs();
        if error <= delta {
            0.5 * error * error
        } else {
            delta * error - 0.5 * delta * delta
        }
    })
    .map(mean_last)
}

/// Kullback-Leibler divergence between `y_true` and `y_pred`
pub fn kl_divergence(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| {
        let t = clip(t, EPSILON, 1.0);
        let p = clip(p, EPSILON, 1.0);
        t * (t / p).ln()
    })
    .map(sum_last)
}

/// Poisson loss: `mean(y_pred - y_true * log(y_pred))`
pub fn poisson(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| p - t * (p + EPSILON).ln()).map(mean_last)
}

/// Binary crossentropy on probabilities
pub fn binary_crossentropy(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    binary_crossentropy_with(y_true, y_pred, false, 0.0)
}

/// Binary crossentropy with optional logits input and label smoothing
pub fn binary_crossentropy_with(
    y_true: &Tensor,
    y_pred: &Tensor,
    from_logits: bool,
    label_smoothing: f64,
) -> Result<Tensor> {
    elementwise(y_true, y_pred, |t, p| {
        let t = t * (1.0 - label_smoothing) + 0.5 * label_smoothing;
        if from_logits {
            p.max(0.0) - p * t + (-p.abs()).exp().ln_1p()
        } else {
            let p = clip(p, EPSILON, 1.0 - EPSILON);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        }
    })
    .map(mean_last)
}

/// Categorical crossentropy on probabilities
pub fn categorical_crossentropy(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    categorical_crossentropy_with(y_true, y_pred, false, 0.0)
}

/// Categorical crossentropy with optional logits input and label smoothing
pub fn categorical_crossentropy_with(
    y_true: &Tensor,
    y_pred: &Tensor,
    from_logits: bool,
    label_smoothing: f64,
) -> Result<Tensor> {
    reduce_lanes(y_true, y_pred, |t, p| {
        let classes = t.len() as f64;
        let smooth = |t: f64| t * (1.0 - label_smoothing) + label_smoothing / classes;
        if from_logits {
            let lse = log_sum_exp(p);
            -t.iter().zip(p.iter()).map(|(&t, &p)| smooth(t) * (p - lse)).sum::<f64>()
        } else {
            let total = p.sum();
            -t.iter()
                .zip(p.iter())
                .map(|(&t, &p)| smooth(t) * clip(p / total, EPSILON, 1.0 - EPSILON).ln())
                .sum::<f64>()
        }
    })
}

/// Sparse categorical crossentropy on probabilities
pub fn sparse_categorical_crossentropy(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    sparse_categorical_crossentropy_with(y_true, y_pred, false)
}

/// Crossentropy between integer class labels and per-class predictions.
///
/// `y_true` has the shape of `y_pred` without its last axis, or with a
/// trailing axis of length one.
pub fn sparse_categorical_crossentropy_with(
    y_true: &Tensor,
    y_pred: &Tensor,
    from_logits: bool,
) -> Result<Tensor> {
    if y_pred.ndim() == 0 {
        return Err(Error::shape("loss inputs need at least one axis"));
    }
    let sample_shape = &y_pred.shape()[..y_pred.ndim() - 1];
    let labels = if y_true.ndim() == y_pred.ndim() && y_true.shape().last() == Some(&1) {
        y_true.index_axis(last_axis(y_true), 0)
    } else {
        y_true.view()
    };
    if labels.shape() != sample_shape {
        return Err(Error::shape(format!(
            "labels {:?} do not match predictions {:?}",
            y_true.shape(),
            y_pred.shape()
        )));
    }

    let axis = last_axis(y_pred);
    let classes = y_pred.len_of(axis);
    let mut values = Vec::with_capacity(labels.len());
    for (&label, lane) in labels.iter().zip(y_pred.lanes(axis)) {
        if label < 0.0 || label.fract() != 0.0 || label as usize >= classes {
            return Err(Error::invalid_input(format!(
                "label {label} is not a class index below {classes}"
            )));
        }
        let index = label as usize;
        let value = if from_logits {
            log_sum_exp(lane) - lane[index]
        } else {
            -clip(lane[index] / lane.sum(), EPSILON, 1.0 - EPSILON).ln()
        };
        values.push(value);
    }
    Tensor::from_shape_vec(IxDyn(sample_shape), values).map_err(|e| Error::shape(e.to_string()))
}

/// Hinge loss: `mean(max(1 - y_true * y_pred, 0))`
pub fn hinge(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(&hinge_labels(y_true), y_pred, |t, p| (1.0 - t * p).max(0.0)).map(mean_last)
}

/// Squared hinge loss: `mean(max(1 - y_true * y_pred, 0)^2)`
pub fn squared_hinge(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    elementwise(&hinge_labels(y_true), y_pred, |t, p| {
        (1.0 - t * p).max(0.0).powi(2)
    })
    .map(mean_last)
}

/// Categorical hinge loss: `max(max_neg - pos + 1, 0)`
pub fn categorical_hinge(y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
    reduce_lanes(y_true, y_pred, |t, p| {
        let pos = t.dot(&p);
        let neg = t
            .iter()
            .zip(p.iter())
            .map(|(&t, &p)| (1.0 - t) * p)
            .fold(f64::NEG_INFINITY, f64::max);
        (neg - pos + 1.0).max(0.0)
    })
}
