use chrono::NaiveDate;

use crate::metrics::ratio;
use crate::models::{AnomalyScan, Direction, LatestAnomaly, ScoredPoint};

/// Inclusive: a point exactly two standard deviations out is flagged, so a single
/// 500 after four months of 100 (z = 2.0 under the population deviation) counts.
pub const Z_THRESHOLD: f64 = 2.0;

/// Scores each point against the series' own mean and population standard deviation.
/// A zero deviation is replaced by 1 so flat series score 0 everywhere. Points at
/// two standard deviations or more are anomalies.
pub fn detect(series: &[(NaiveDate, f64)]) -> AnomalyScan {
    let Some(&(_, first)) = series.first() else {
        return AnomalyScan {
            mean: 0.0,
            std_dev: 1.0,
            points: Vec::new(),
        };
    };

    let n = series.len() as f64;
    let shift = series.iter().map(|(_, v)| v - first).sum::<f64>() / n;
    let mean = first + shift;
    let variance = series
        .iter()
        .map(|(_, v)| {
            let d = (v - first) - shift;
            d * d
        })
        .sum::<f64>()
        / n;
    let std_dev = if variance > 0.0 { variance.sqrt() } else { 1.0 };

    let points = series
        .iter()
        .map(|&(month, value)| {
            let z_score = ((value - first) - shift) / std_dev;
            ScoredPoint {
                month,
                value,
                z_score,
                anomaly: z_score.abs() >= Z_THRESHOLD,
            }
        })
        .collect();

    AnomalyScan {
        mean,
        std_dev,
        points,
    }
}

/// Details for the most recent point when it is anomalous.
pub fn latest_anomaly(scan: &AnomalyScan) -> Option<LatestAnomaly> {
    let last = scan.points.last().filter(|p| p.anomaly)?;
    let deviation_pct = ratio(last.value - scan.mean, scan.mean) * 100.0;
    let direction = if last.value < scan.mean {
        Direction::Drop
    } else {
        Direction::Spike
    };

    Some(LatestAnomaly {
        month: last.month,
        value: last.value,
        z_score: last.z_score,
        deviation_pct,
        direction,
    })
}
