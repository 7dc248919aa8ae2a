//! Low-level fitting routine for a single logistic model kind.
//!
//! Given standard points `(x_i, y_i)` (concentration, mean OD) we minimize
//!
//! ```text
//! SSE(θ) = Σ (y_i - f(x_i; θ))^2
//! ```
//!
//! with plain gradient descent:
//! - the gradient is a central finite difference per parameter
//!   (step `|θ_j| * 1e-4 + 1e-4`)
//! - a step is accepted only if it strictly lowers SSE; the learning rate then
//!   grows (capped), otherwise it decays (floored)
//! - the run stops at the iteration cap or once the learning rate hits its floor
//! - `b`, `c` (and `g` for 5PL) are clamped to a small positive floor after
//!   every update, including the perturbed vectors used for the gradient
//!
//! Initialization is data-driven: `a = max(y)`, `d = min(y)`, `c = median(x)`,
//! `b = 1`, `g = 1`. This is a best-effort optimizer; there is no restart if
//! it stalls on ill-conditioned data.

use nalgebra::DVector;

use crate::domain::{CurveModel, FitConfig, ModelKind, StandardPoint};
use crate::math::total_sum_of_squares;
use crate::models::{from_slice, predict};

/// Fit a single model kind.
///
/// Returns `None` with no points, fewer than `config.min_points` points, or
/// when the loss is not finite (e.g. negative concentrations).
pub fn fit_logistic(points: &[StandardPoint], kind: ModelKind, config: &FitConfig) -> Option<CurveModel> {
    if points.len() < config.min_points.max(1) {
        return None;
    }

    let xs: Vec<f64> = points.iter().map(|p| p.concentration).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.mean_od).collect();

    let mut params = clamp(initial_params(kind, &xs, &ys), kind, config.param_floor);
    let mut loss = sse(kind, &xs, &ys, &params);
    let mut learning_rate = config.learning_rate;

    for _ in 0..config.max_iterations {
        let gradient = numeric_gradient(kind, &xs, &ys, &params, config.param_floor);
        let candidate = clamp(&params - gradient * learning_rate, kind, config.param_floor);
        let candidate_loss = sse(kind, &xs, &ys, &candidate);

        if candidate_loss < loss {
            params = candidate;
            loss = candidate_loss;
            learning_rate = (learning_rate * config.learning_rate_growth).min(config.learning_rate_max);
        } else {
            learning_rate = (learning_rate * config.learning_rate_decay).max(config.learning_rate_min);
        }

        if learning_rate <= config.learning_rate_min {
            break;
        }
    }

    if !loss.is_finite() {
        return None;
    }

    let tss = total_sum_of_squares(&ys);
    let r_squared = (tss > 0.0).then(|| 1.0 - loss / tss);

    Some(CurveModel {
        kind,
        parameters: from_slice(kind, params.as_slice()),
        sse: loss,
        r_squared,
    })
}

fn initial_params(kind: ModelKind, xs: &[f64], ys: &[f64]) -> DVector<f64> {
    let a = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let d = ys.iter().copied().fold(f64::INFINITY, f64::min);

    let mut sorted = xs.to_vec();
    sorted.sort_by(|l, r| l.partial_cmp(r).unwrap_or(std::cmp::Ordering::Equal));
    let median = sorted[sorted.len() / 2];
    let c = if median == 0.0 || median.is_nan() { 1.0 } else { median };

    DVector::from_row_slice(&[a, 1.0, c, d, 1.0][..kind.param_count()])
}

// Indices into the parameter vector: [a, b, c, d, g].
const B: usize = 1;
const C: usize = 2;
const G: usize = 4;

fn clamp(mut params: DVector<f64>, kind: ModelKind, floor: f64) -> DVector<f64> {
    params[B] = params[B].max(floor);
    params[C] = params[C].max(floor);
    if kind == ModelKind::FivePl {
        params[G] = params[G].max(floor);
    }
    params
}

fn sse(kind: ModelKind, xs: &[f64], ys: &[f64], params: &DVector<f64>) -> f64 {
    let p = from_slice(kind, params.as_slice());
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - predict(kind, x, &p);
            r * r
        })
        .sum()
}

fn numeric_gradient(kind: ModelKind, xs: &[f64], ys: &[f64], params: &DVector<f64>, floor: f64) -> DVector<f64> {
    DVector::from_fn(params.len(), |j, _| {
        let delta = params[j].abs() * 1e-4 + 1e-4;
        let mut plus = params.clone();
        let mut minus = params.clone();
        plus[j] += delta;
        minus[j] -= delta;
        let loss_plus = sse(kind, xs, ys, &clamp(plus, kind, floor));
        let loss_minus = sse(kind, xs, ys, &clamp(minus, kind, floor));
        (loss_plus - loss_minus) / (2.0 * delta)
    })
}
