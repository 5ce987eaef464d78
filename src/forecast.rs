use crate::metrics::ratio;
use crate::models::{GrowthTrend, TrendEstimate};

pub const MOVING_AVERAGE_WINDOW: usize = 3;
pub const DEFAULT_HORIZON: usize = 3;

/// Trailing mean over up to `window` samples; the first points average what is available.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Least-squares `(slope, intercept)` of value against index 0..n. A single point is flat.
pub fn linear_fit(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    let n = values.len() as f64;
    if values.len() == 1 {
        return Some((0.0, first));
    }

    // shifted by the first value so a constant series fits exactly
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().map(|v| v - first).sum::<f64>() / n;
    let (sxy, sxx) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, v)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (v - first), sxx + dx * dx)
        });
    let slope = ratio(sxy, sxx);
    let intercept = first + y_mean - slope * x_mean;
    Some((slope, intercept))
}

/// Moving average, fitted trend and next-step forecast for one series.
/// Returns `None` for an empty series.
pub fn estimate(values: &[f64]) -> Option<TrendEstimate> {
    let (slope, intercept) = linear_fit(values)?;
    let trend_line = (0..values.len())
        .map(|i| intercept + slope * i as f64)
        .collect();
    let forecast_next = (intercept + slope * values.len() as f64).max(0.0);

    Some(TrendEstimate {
        moving_average: moving_average(values, MOVING_AVERAGE_WINDOW),
        trend_line,
        slope,
        intercept,
        forecast_next,
    })
}

/// The fitted line continued `horizon` steps past the series, floored at zero.
pub fn project(estimate: &TrendEstimate, horizon: usize) -> Vec<f64> {
    let n = estimate.trend_line.len();
    (n..n + horizon)
        .map(|i| (estimate.intercept + estimate.slope * i as f64).max(0.0))
        .collect()
}

/// Percentage change from the last fitted value to the end of the projection.
pub fn growth_pct(estimate: &TrendEstimate, horizon: usize) -> f64 {
    let Some(&base) = estimate.trend_line.last() else {
        return 0.0;
    };
    let Some(&target) = project(estimate, horizon).last() else {
        return 0.0;
    };
    ratio(target - base, base) * 100.0
}

pub fn classify_growth(growth_pct: f64) -> GrowthTrend {
    if growth_pct > 15.0 {
        GrowthTrend::StrongUpward
    } else if growth_pct > 5.0 {
        GrowthTrend::ModerateGrowth
    } else if growth_pct > 0.0 {
        GrowthTrend::SlightUpward
    } else {
        GrowthTrend::Downward
    }
}
