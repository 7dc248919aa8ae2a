//! Small descriptive statistics used by the QC metrics.
//!
//! Everything here is total: empty inputs give `None` rather than NaN so the
//! results can flow straight into JSON.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator) around a known mean.
///
/// Returns `0.0` for fewer than two values.
pub fn sample_sd(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Coefficient of variation in percent; undefined when the mean is zero.
pub fn cv_percent(sd: f64, mean: f64) -> Option<f64> {
    if mean == 0.0 {
        return None;
    }
    let cv = sd / mean * 100.0;
    cv.is_finite().then_some(cv)
}

/// Mean, SD and CV% of one group of readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub mean: f64,
    pub sd: f64,
    pub cv_percent: Option<f64>,
}

pub fn spread(values: &[f64]) -> Option<Spread> {
    let mean = mean(values)?;
    let sd = sample_sd(values, mean);
    Some(Spread {
        mean,
        sd,
        cv_percent: cv_percent(sd, mean),
    })
}

/// Total sum of squares around the mean.
pub fn total_sum_of_squares(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    values.iter().map(|v| (v - m) * (v - m)).sum()
}
