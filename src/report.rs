use std::fmt::Write;

use chrono::NaiveDate;

use crate::anomaly;
use crate::cost::CostModel;
use crate::filter::{CategorySelection, CourseFilter};
use crate::forecast;
use crate::metrics::{self, RankBy};
use crate::models::{DerivedCourse, LatestAnomaly, Metric};

pub const NO_DATA: &str = "no data";

/// Fixed decimals with `,` thousands separators.
pub fn format_number(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3 + 1);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    if value.is_sign_negative() && !is_zero {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn format_currency(value: f64) -> String {
    format!("{} €", format_number(value, 0))
}

pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format_number(v, decimals))
        .unwrap_or_else(|| NO_DATA.to_string())
}

pub fn period_label(month: NaiveDate) -> String {
    month.format("%B %Y").to_string()
}

fn format_metric_value(metric: Metric, value: f64) -> String {
    match metric {
        Metric::Revenue => format_currency(value),
        Metric::Participants => format_number(value, 0),
    }
}

fn describe_filter(filter: &CourseFilter) -> String {
    let category = match &filter.category {
        CategorySelection::All => "all subjects".to_string(),
        CategorySelection::Only(subject) => format!("subject {subject}"),
    };
    format!(
        "price {}-{}, satisfaction {}-{}, {}",
        format_number(*filter.price.start(), 2),
        format_number(*filter.price.end(), 2),
        format_number(*filter.satisfaction.start(), 2),
        format_number(*filter.satisfaction.end(), 2),
        category
    )
}

pub fn build_dashboard_report(
    filter: &CourseFilter,
    cost_model: &CostModel,
    rows: &[DerivedCourse],
) -> String {
    let kpis = metrics::kpis(rows);
    let quadrants = metrics::quadrants(rows);
    let subjects = metrics::by_subject(rows);

    let mut output = String::new();

    let _ = writeln!(output, "# Course Portfolio Report");
    let _ = writeln!(output, "Filtered to {}", describe_filter(filter));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Figures");
    let _ = writeln!(output, "- Courses: {}", format_number(kpis.course_count as f64, 0));
    let _ = writeln!(output, "- Total revenue: {}", format_currency(kpis.total_revenue));
    let _ = writeln!(
        output,
        "- Participants: {}",
        format_number(kpis.total_participants as f64, 0)
    );
    let _ = writeln!(
        output,
        "- Avg. satisfaction: {}",
        kpis.avg_satisfaction
            .map(|v| format!("{:.2}/5", v))
            .unwrap_or_else(|| NO_DATA.to_string())
    );
    let _ = writeln!(
        output,
        "- Revenue per participant: {}",
        kpis.avg_revenue_per_participant
            .map(format_currency)
            .unwrap_or_else(|| NO_DATA.to_string())
    );
    let _ = writeln!(
        output,
        "- Engagement index: {}",
        format_optional(kpis.avg_engagement_index, 2)
    );
    let _ = writeln!(output, "- Avg. ROI: {}", format_optional(kpis.avg_roi, 2));
    if !cost_model.is_authoritative() {
        let _ = writeln!(
            output,
            "  (ROI not authoritative: program cost {})",
            cost_model.describe()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Revenue vs Satisfaction");
    if rows.is_empty() {
        let _ = writeln!(output, "No courses match this filter.");
    } else {
        let _ = writeln!(output, "| Revenue \\ Satisfaction | High | Low |");
        let _ = writeln!(output, "|---|---|---|");
        let _ = writeln!(
            output,
            "| High | {} | {} |",
            quadrants.high_revenue_high_satisfaction, quadrants.high_revenue_low_satisfaction
        );
        let _ = writeln!(
            output,
            "| Low | {} | {} |",
            quadrants.low_revenue_high_satisfaction, quadrants.low_revenue_low_satisfaction
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    if subjects.is_empty() {
        let _ = writeln!(output, "No courses match this filter.");
    } else {
        for subject in &subjects {
            let _ = writeln!(
                output,
                "- {}: {} across {} courses (avg satisfaction {:.2}, ROI {})",
                subject.subject,
                format_currency(subject.total_revenue),
                subject.course_count,
                subject.avg_satisfaction,
                format_optional(subject.avg_roi, 2)
            );
        }
    }

    for (title, rank) in [
        ("Top Revenue", RankBy::Revenue),
        ("Top ROI", RankBy::Roi),
        ("Top Revenue per Participant", RankBy::RevenuePerParticipant),
    ] {
        let top = metrics::top_by(rows, rank, 10);
        let _ = writeln!(output);
        let _ = writeln!(output, "## {title}");
        if top.is_empty() {
            let _ = writeln!(output, "{}", NO_DATA);
            continue;
        }
        for row in top {
            let value = match rank {
                RankBy::Revenue => format_currency(row.revenue),
                RankBy::Roi => format_optional(row.roi, 2),
                RankBy::RevenuePerParticipant => format_currency(row.revenue_per_participant),
            };
            let _ = writeln!(
                output,
                "- {} ({}): {} (satisfaction {:.2})",
                row.course_name, row.subject, value, row.satisfaction
            );
        }
    }

    output
}

pub fn build_forecast_report(
    course: &str,
    metric: Metric,
    series: &[(NaiveDate, f64)],
    horizon: usize,
) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# {} Forecast: {}", metric.label(), course);

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let (Some(estimate), Some(&(last_month, last_value))) =
        (forecast::estimate(&values), series.last())
    else {
        let _ = writeln!(output, "No monthly data for this course.");
        return output;
    };

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Last {} ({}): {}",
        metric.label().to_lowercase(),
        period_label(last_month),
        format_metric_value(metric, last_value)
    );
    let _ = writeln!(output, "- Trend slope: {}", format_number(estimate.slope, 2));
    let _ = writeln!(
        output,
        "- Forecast next month: {}",
        format_metric_value(metric, estimate.forecast_next)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Detail");
    let _ = writeln!(output, "| Month | Value | Moving avg | Trend |");
    let _ = writeln!(output, "|---|---|---|---|");
    for (i, (month, value)) in series.iter().enumerate() {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            month.format("%Y-%m"),
            format_number(*value, 0),
            format_number(estimate.moving_average[i], 0),
            format_number(estimate.trend_line[i], 0)
        );
    }

    let growth = forecast::growth_pct(&estimate, horizon);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Outlook ({} months)", horizon);
    for (step, value) in forecast::project(&estimate, horizon).iter().enumerate() {
        let _ = writeln!(
            output,
            "- +{}: {}",
            step + 1,
            format_metric_value(metric, *value)
        );
    }
    let _ = writeln!(output, "- Growth vs. today: {:.1}%", growth);
    let _ = writeln!(
        output,
        "- Trend classification: {}",
        forecast::classify_growth(growth).label()
    );

    let scan = anomaly::detect(series);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Anomalies");
    let _ = writeln!(
        output,
        "Mean {}, standard deviation {}",
        format_number(scan.mean, 2),
        format_number(scan.std_dev, 2)
    );
    let flagged: Vec<_> = scan.points.iter().filter(|p| p.anomaly).collect();
    if flagged.is_empty() {
        let _ = writeln!(output, "No month deviates by two standard deviations or more.");
    } else {
        for point in flagged {
            let _ = writeln!(
                output,
                "- {}: {} (z-score {:.2})",
                period_label(point.month),
                format_metric_value(metric, point.value),
                point.z_score
            );
        }
    }

    let _ = writeln!(output);
    match anomaly::latest_anomaly(&scan) {
        Some(latest) => {
            let _ = writeln!(output, "## Insight for {}", period_label(latest.month));
            let _ = writeln!(
                output,
                "- {}: {:.1}%",
                latest.direction.describe(metric),
                latest.deviation_pct
            );
            let _ = writeln!(output, "- Z-score: {:.2}", latest.z_score);
            let _ = writeln!(
                output,
                "- Compared to normal demand, this value is outside typical variation."
            );
        }
        None => {
            let _ = writeln!(output, "No anomaly in the latest month.");
        }
    }

    output
}

/// Plain-text body for the outbound anomaly notification.
pub fn alert_message(course: &str, metric: Metric, anomaly: &LatestAnomaly) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "*{} Anomaly Detected!*", metric.label());
    let _ = writeln!(output, "Course: *{}*", course);
    let _ = writeln!(output, "Month: *{}*", period_label(anomaly.month));
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "• {}: *{}*",
        metric.label(),
        format_metric_value(metric, anomaly.value)
    );
    let _ = writeln!(output, "• Z-Score: *{:.2}*", anomaly.z_score);
    let _ = writeln!(
        output,
        "• Deviation: *{:.1}%* from normal",
        anomaly.deviation_pct
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Please review immediately.");
    output
}
