use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseRecord {
    pub course_name: String,
    #[serde(alias = "category")]
    pub subject: String,
    pub price: f64,
    pub participants: u64,
    pub revenue: f64,
    pub satisfaction: f64,
    pub num_reviews: u64,
    #[serde(default)]
    pub program_cost: Option<f64>,
}

/// A course row together with the columns computed from it and its table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedCourse {
    pub course_name: String,
    pub subject: String,
    pub price: f64,
    pub participants: u64,
    pub revenue: f64,
    pub satisfaction: f64,
    pub num_reviews: u64,
    pub revenue_per_participant: f64,
    pub satisfaction_score: f64,
    pub adoption_score: f64,
    pub engagement_score: f64,
    pub engagement_index: f64,
    pub program_cost: Option<f64>,
    pub roi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub course_count: usize,
    pub total_revenue: f64,
    pub total_participants: u64,
    pub avg_satisfaction: Option<f64>,
    pub avg_revenue_per_participant: Option<f64>,
    pub avg_roi: Option<f64>,
    pub avg_engagement_index: Option<f64>,
}

/// Course counts by revenue level (rows) and satisfaction level (columns).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuadrantCounts {
    pub high_revenue_high_satisfaction: usize,
    pub high_revenue_low_satisfaction: usize,
    pub low_revenue_high_satisfaction: usize,
    pub low_revenue_low_satisfaction: usize,
}

impl QuadrantCounts {
    pub fn total(&self) -> usize {
        self.high_revenue_high_satisfaction
            + self.high_revenue_low_satisfaction
            + self.low_revenue_high_satisfaction
            + self.low_revenue_low_satisfaction
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub subject: String,
    pub course_count: usize,
    pub total_revenue: f64,
    pub avg_satisfaction: f64,
    pub avg_roi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub course_name: String,
    pub month: NaiveDate,
    pub revenue_monthly: f64,
    pub participants_monthly: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Metric {
    Revenue,
    Participants,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::Participants => "Participants",
        }
    }

    pub fn value_of(self, point: &SeriesPoint) -> f64 {
        match self {
            Metric::Revenue => point.revenue_monthly,
            Metric::Participants => point.participants_monthly,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendEstimate {
    pub moving_average: Vec<f64>,
    pub trend_line: Vec<f64>,
    pub slope: f64,
    pub intercept: f64,
    pub forecast_next: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthTrend {
    StrongUpward,
    ModerateGrowth,
    SlightUpward,
    Downward,
}

impl GrowthTrend {
    pub fn label(self) -> &'static str {
        match self {
            GrowthTrend::StrongUpward => "strong upward trend",
            GrowthTrend::ModerateGrowth => "moderate growth",
            GrowthTrend::SlightUpward => "slight upward trend",
            GrowthTrend::Downward => "downward trend",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub month: NaiveDate,
    pub value: f64,
    pub z_score: f64,
    pub anomaly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScan {
    pub mean: f64,
    pub std_dev: f64,
    pub points: Vec<ScoredPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Drop,
    Spike,
}

impl Direction {
    pub fn describe(self, metric: Metric) -> String {
        match self {
            Direction::Drop => format!("{} dropped significantly", metric.label()),
            Direction::Spike => format!("{} spiked unexpectedly", metric.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestAnomaly {
    pub month: NaiveDate,
    pub value: f64,
    pub z_score: f64,
    pub deviation_pct: f64,
    pub direction: Direction,
}
