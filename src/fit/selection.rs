//! Model selection (4PL vs 5PL).
//!
//! Both models are fitted independently (in parallel) and compared on SSE:
//! 1. If both fits succeed, the lower SSE wins; on an exact tie 4PL is kept.
//! 2. If only one succeeds, it is used.
//! 3. If neither succeeds, there is no curve.
//!
//! The tie rule favours the simpler model and is kept deliberately even
//! though it can hide an equally good 5PL on degenerate inputs.

use crate::domain::{CurveModel, FitConfig, ModelFits, ModelKind, StandardPoint};
use crate::fit::fitter::fit_logistic;

/// Output of fitting + selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitSelection {
    pub best: Option<CurveModel>,
    pub fits: ModelFits,
    /// Models that produced no fit and why (for diagnostics).
    pub skipped: Vec<(ModelKind, String)>,
}

/// Fit 4PL and 5PL and select the better one.
pub fn fit_and_select(points: &[StandardPoint], config: &FitConfig) -> FitSelection {
    let (four_pl, five_pl) = rayon::join(
        || fit_logistic(points, ModelKind::FourPl, config),
        || fit_logistic(points, ModelKind::FivePl, config),
    );

    let mut skipped = Vec::new();
    for (kind, fit) in [(ModelKind::FourPl, &four_pl), (ModelKind::FivePl, &five_pl)] {
        if fit.is_some() {
            continue;
        }
        let required = config.min_points.max(1);
        let reason = if points.len() < required {
            format!("Underdetermined: n={} < {}", points.len(), required)
        } else {
            "Non-finite loss".to_string()
        };
        skipped.push((kind, reason));
    }

    let best = select_best(four_pl.as_ref(), five_pl.as_ref()).cloned();
    if let Some(model) = &best {
        tracing::info!(
            model = model.kind.display_name(),
            sse = model.sse,
            r_squared = ?model.r_squared,
            "Selected standard curve model"
        );
    }

    FitSelection {
        best,
        fits: ModelFits { four_pl, five_pl },
        skipped,
    }
}

/// Lower-or-equal SSE wins; 4PL is preferred on ties.
pub fn select_best<'a>(four_pl: Option<&'a CurveModel>, five_pl: Option<&'a CurveModel>) -> Option<&'a CurveModel> {
    match (four_pl, five_pl) {
        (Some(four), Some(five)) => Some(if four.sse <= five.sse { four } else { five }),
        (four, five) => four.or(five),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LogisticParams;
    use crate::models::predict;

    fn model(kind: ModelKind, sse: f64) -> CurveModel {
        CurveModel {
            kind,
            parameters: LogisticParams {
                a: 1.0,
                b: 1.0,
                c: 1.0,
                d: 0.0,
                g: (kind == ModelKind::FivePl).then_some(1.0),
            },
            sse,
            r_squared: None,
        }
    }

    #[test]
    fn tie_prefers_four_pl() {
        let four = model(ModelKind::FourPl, 0.5);
        let five = model(ModelKind::FivePl, 0.5);
        assert_eq!(select_best(Some(&four), Some(&five)).unwrap().kind, ModelKind::FourPl);
    }

    #[test]
    fn lower_sse_wins() {
        let four = model(ModelKind::FourPl, 0.5);
        let five = model(ModelKind::FivePl, 0.4);
        assert_eq!(select_best(Some(&four), Some(&five)).unwrap().kind, ModelKind::FivePl);
    }

    #[test]
    fn single_success_is_used() {
        let five = model(ModelKind::FivePl, 3.0);
        assert_eq!(select_best(None, Some(&five)).unwrap().kind, ModelKind::FivePl);
        assert!(select_best(None, None).is_none());
    }

    #[test]
    fn fit_and_select_on_synthetic_curve() {
        let p = LogisticParams {
            a: 1.8,
            b: 1.0,
            c: 5.0,
            d: 0.05,
            g: None,
        };
        let points: Vec<StandardPoint> = [0.05, 0.5, 5.0, 50.0, 500.0]
            .iter()
            .map(|&x| StandardPoint {
                concentration: x,
                mean_od: predict(ModelKind::FourPl, x, &p),
                reading_count: 1,
            })
            .collect();

        let selection = fit_and_select(&points, &FitConfig::default());
        let best = selection.best.unwrap();
        let four = selection.fits.four_pl.unwrap();
        let five = selection.fits.five_pl.unwrap();
        assert!(best.sse <= four.sse && best.sse <= five.sse);
        assert!(selection.skipped.is_empty());
    }

    #[test]
    fn too_few_points_are_skipped_with_reason() {
        let points: Vec<StandardPoint> = (0..3)
            .map(|i| StandardPoint {
                concentration: i as f64 + 1.0,
                mean_od: 1.0 / (i as f64 + 1.0),
                reading_count: 1,
            })
            .collect();
        let selection = fit_and_select(&points, &FitConfig::default());
        assert!(selection.best.is_none());
        assert_eq!(selection.skipped.len(), 2);
        assert!(selection.skipped[0].1.contains("n=3 < 4"));
    }
}
