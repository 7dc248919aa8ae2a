//! Logistic dose-response evaluation for 4PL / 5PL.
//!
//! - 4PL: `y = d + (a - d) / (1 + (x/c)^b)`
//! - 5PL: `y = d + (a - d) / (1 + (x/c)^b)^g`
//!
//! The fitter relies on `predict`; QC metrics rely on `inverse` to read
//! concentrations back off the curve.

use crate::domain::{LogisticParams, ModelKind};

/// Predict the response at concentration `x`.
pub fn predict(kind: ModelKind, x: f64, p: &LogisticParams) -> f64 {
    let base = 1.0 + (x / p.c).powf(p.b);
    match kind {
        ModelKind::FourPl => p.d + (p.a - p.d) / base,
        ModelKind::FivePl => p.d + (p.a - p.d) / base.powf(p.asymmetry()),
    }
}

/// Solve the model for `x` given a response `y`.
///
/// Returns `None` whenever `y` lies outside the invertible range of the curve:
/// on the `d` asymptote, with degenerate asymptotes (`a == d`), or beyond the
/// asymptotes.
pub fn inverse(kind: ModelKind, y: f64, p: &LogisticParams) -> Option<f64> {
    if y == p.d || p.a == p.d {
        return None;
    }
    let ratio = (p.a - p.d) / (y - p.d);
    if !ratio.is_finite() || ratio <= 1.0 {
        return None;
    }
    let exponent = match kind {
        ModelKind::FourPl => 1.0,
        ModelKind::FivePl => 1.0 / p.asymmetry(),
    };
    let base = ratio.powf(exponent) - 1.0;
    if base <= 0.0 {
        return None;
    }
    let x = p.c * base.powf(1.0 / p.b);
    x.is_finite().then_some(x)
}

/// Unpack a flat `[a, b, c, d, g]` parameter vector.
///
/// # Panics
/// Panics if `values` is shorter than `kind.param_count()`.
pub fn from_slice(kind: ModelKind, values: &[f64]) -> LogisticParams {
    assert!(
        values.len() >= kind.param_count(),
        "{} needs {} parameters, got {}",
        kind.display_name(),
        kind.param_count(),
        values.len()
    );
    LogisticParams {
        a: values[0],
        b: values[1],
        c: values[2],
        d: values[3],
        g: match kind {
            ModelKind::FourPl => None,
            ModelKind::FivePl => Some(values[4]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> LogisticParams {
        LogisticParams {
            a: 2.0,
            b: 1.3,
            c: 10.0,
            d: 0.1,
            g: None,
        }
    }

    #[test]
    fn predict_hits_midpoint_at_c() {
        let p = params();
        let y = predict(ModelKind::FourPl, 10.0, &p);
        assert!((y - 1.05).abs() < 1e-12);
    }

    #[test]
    fn inverse_undoes_predict() {
        let p4 = params();
        let p5 = LogisticParams { g: Some(0.7), ..params() };
        for &x in &[0.5, 3.0, 10.0, 42.0] {
            let y = predict(ModelKind::FourPl, x, &p4);
            assert!((inverse(ModelKind::FourPl, y, &p4).unwrap() - x).abs() < 1e-8 * x.max(1.0));
            let y = predict(ModelKind::FivePl, x, &p5);
            assert!((inverse(ModelKind::FivePl, y, &p5).unwrap() - x).abs() < 1e-8 * x.max(1.0));
        }
    }

    #[test]
    fn inverse_rejects_out_of_range() {
        let p = params();
        assert_eq!(inverse(ModelKind::FourPl, p.d, &p), None);
        // Beyond the upper asymptote: ratio < 1.
        assert_eq!(inverse(ModelKind::FourPl, 2.5, &p), None);
        // Below the lower asymptote: ratio negative.
        assert_eq!(inverse(ModelKind::FourPl, 0.0, &p), None);
        let flat = LogisticParams { d: 2.0, ..p };
        assert_eq!(inverse(ModelKind::FourPl, 1.0, &flat), None);
    }

    #[test]
    fn from_slice_reads_asymmetry_for_5pl_only() {
        let values = [2.0, 1.3, 10.0, 0.1, 0.8];
        assert_eq!(from_slice(ModelKind::FourPl, &values), params());
        let five = from_slice(ModelKind::FivePl, &values);
        assert_eq!(five, LogisticParams { g: Some(0.8), ..params() });
    }

    #[test]
    #[should_panic(expected = "5PL needs 5 parameters")]
    fn from_slice_rejects_short_vectors() {
        from_slice(ModelKind::FivePl, &[2.0, 1.3, 10.0, 0.1]);
    }
}
