use std::cmp::Ordering;
use std::collections::HashMap;

use crate::cost::{self, CostModel};
use crate::models::{CourseRecord, DerivedCourse, Kpis, QuadrantCounts, SubjectSummary};

/// Adds every derived column to the table. Percentile ranks are relative to `courses`.
pub fn derive(courses: &[CourseRecord], cost_model: &CostModel) -> Vec<DerivedCourse> {
    let participants: Vec<f64> = courses.iter().map(|c| c.participants as f64).collect();
    let reviews: Vec<f64> = courses.iter().map(|c| c.num_reviews as f64).collect();
    let adoption = percentile_ranks(&participants);
    let engagement = percentile_ranks(&reviews);
    let costs = cost_model.costs(courses);

    courses
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let satisfaction_score = course.satisfaction / 5.0;
            let program_cost = costs[i];
            DerivedCourse {
                course_name: course.course_name.clone(),
                subject: course.subject.clone(),
                price: course.price,
                participants: course.participants,
                revenue: course.revenue,
                satisfaction: course.satisfaction,
                num_reviews: course.num_reviews,
                revenue_per_participant: ratio(course.revenue, course.participants as f64),
                satisfaction_score,
                adoption_score: adoption[i],
                engagement_score: engagement[i],
                engagement_index: (adoption[i] + engagement[i] + satisfaction_score) / 3.0,
                program_cost,
                roi: program_cost.map(|cost| cost::roi(course.revenue, cost)),
            }
        })
        .collect()
}

pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Average rank divided by the row count, so ties share a rank and the maximum is 1.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // 1-based positions start+1..=end+1
        let average_rank = (start + end + 2) as f64 / 2.0;
        for &index in &order[start..=end] {
            ranks[index] = average_rank / n as f64;
        }
        start = end + 1;
    }
    ranks
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn kpis(rows: &[DerivedCourse]) -> Kpis {
    Kpis {
        course_count: rows.len(),
        total_revenue: rows.iter().map(|r| r.revenue).sum(),
        total_participants: rows.iter().map(|r| r.participants).sum(),
        avg_satisfaction: mean(rows.iter().map(|r| r.satisfaction)),
        avg_revenue_per_participant: mean(rows.iter().map(|r| r.revenue_per_participant)),
        avg_roi: mean(rows.iter().filter_map(|r| r.roi)),
        avg_engagement_index: mean(rows.iter().map(|r| r.engagement_index)),
    }
}

/// Splits rows at the median revenue and median satisfaction.
/// Values equal to a median count as high.
pub fn quadrants(rows: &[DerivedCourse]) -> QuadrantCounts {
    let revenues: Vec<f64> = rows.iter().map(|r| r.revenue).collect();
    let satisfactions: Vec<f64> = rows.iter().map(|r| r.satisfaction).collect();
    let (Some(median_revenue), Some(median_satisfaction)) =
        (median(&revenues), median(&satisfactions))
    else {
        return QuadrantCounts::default();
    };

    let mut counts = QuadrantCounts::default();
    for row in rows {
        let high_revenue = row.revenue >= median_revenue;
        let high_satisfaction = row.satisfaction >= median_satisfaction;
        match (high_revenue, high_satisfaction) {
            (true, true) => counts.high_revenue_high_satisfaction += 1,
            (true, false) => counts.high_revenue_low_satisfaction += 1,
            (false, true) => counts.low_revenue_high_satisfaction += 1,
            (false, false) => counts.low_revenue_low_satisfaction += 1,
        }
    }
    counts
}

pub fn by_subject(rows: &[DerivedCourse]) -> Vec<SubjectSummary> {
    let mut groups: HashMap<&str, Vec<&DerivedCourse>> = HashMap::new();
    for row in rows {
        groups.entry(row.subject.as_str()).or_default().push(row);
    }

    let mut summaries: Vec<SubjectSummary> = groups
        .into_iter()
        .map(|(subject, members)| SubjectSummary {
            subject: subject.to_string(),
            course_count: members.len(),
            total_revenue: members.iter().map(|r| r.revenue).sum(),
            avg_satisfaction: mean(members.iter().map(|r| r.satisfaction)).unwrap_or(0.0),
            avg_roi: mean(members.iter().filter_map(|r| r.roi)),
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.total_revenue
            .partial_cmp(&a.total_revenue)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.subject.cmp(&b.subject))
    });
    summaries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Revenue,
    Roi,
    RevenuePerParticipant,
}

impl RankBy {
    fn key(self, row: &DerivedCourse) -> Option<f64> {
        match self {
            RankBy::Revenue => Some(row.revenue),
            RankBy::Roi => row.roi,
            RankBy::RevenuePerParticipant => Some(row.revenue_per_participant),
        }
    }
}

/// The `limit` highest rows by `rank`, skipping rows without a value for it.
pub fn top_by(rows: &[DerivedCourse], rank: RankBy, limit: usize) -> Vec<&DerivedCourse> {
    let mut ranked: Vec<(f64, &DerivedCourse)> = rows
        .iter()
        .filter_map(|row| rank.key(row).map(|key| (key, row)))
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked.into_iter().take(limit).map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(
        name: &str,
        subject: &str,
        participants: u64,
        revenue: f64,
        satisfaction: f64,
    ) -> CourseRecord {
        CourseRecord {
            course_name: name.to_string(),
            subject: subject.to_string(),
            price: 25.0,
            participants,
            revenue,
            satisfaction,
            num_reviews: participants / 10,
            program_cost: Some(revenue / 2.0),
        }
    }

    fn sample() -> Vec<CourseRecord> {
        vec![
            course("Rust Basics", "Software", 120, 6000.0, 4.6),
            course("Async Rust", "Software", 40, 3200.0, 4.1),
            course("Statistics", "Data", 0, 0.0, 3.2),
            course("SQL Deep Dive", "Data", 80, 2400.0, 4.8),
        ]
    }

    #[test]
    fn zero_participants_give_zero_revenue_per_participant() {
        let rows = derive(&sample(), &CostModel::Supplied);
        let stats = rows.iter().find(|r| r.course_name == "Statistics").unwrap();
        assert_eq!(stats.revenue_per_participant, 0.0);
        assert_eq!(rows[0].revenue_per_participant, 50.0);
    }

    #[test]
    fn satisfaction_score_is_normalized() {
        for row in derive(&sample(), &CostModel::Supplied) {
            assert_eq!(row.satisfaction_score, row.satisfaction / 5.0);
            assert!((0.0..=1.0).contains(&row.satisfaction_score));
        }
    }

    #[test]
    fn percentile_ranks_average_ties() {
        let ranks = percentile_ranks(&[10.0, 20.0, 20.0, 40.0]);
        assert_eq!(ranks, vec![0.25, 0.625, 0.625, 1.0]);
    }

    #[test]
    fn percentile_ranks_are_monotonic() {
        let values = [5.0, 1.0, 9.0, 3.0, 3.0, 7.0];
        let ranks = percentile_ranks(&values);
        for i in 0..values.len() {
            assert!(ranks[i] > 0.0 && ranks[i] <= 1.0);
            for j in 0..values.len() {
                if values[i] < values[j] {
                    assert!(ranks[i] <= ranks[j]);
                }
            }
        }
    }

    #[test]
    fn single_row_table() {
        let only = CourseRecord {
            participants: 0,
            revenue: 100.0,
            ..course("Solo", "Data", 0, 100.0, 4.0)
        };
        let rows = derive(&[only], &CostModel::Supplied);
        assert_eq!(rows[0].revenue_per_participant, 0.0);
        assert_eq!(rows[0].adoption_score, 1.0);
        assert_eq!(rows[0].engagement_score, 1.0);
    }

    #[test]
    fn engagement_index_averages_components() {
        let rows = derive(&sample(), &CostModel::Supplied);
        for row in &rows {
            let expected =
                (row.adoption_score + row.engagement_score + row.satisfaction_score) / 3.0;
            assert!((row.engagement_index - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn roi_uses_cost_model() {
        let rows = derive(&sample(), &CostModel::Supplied);
        assert_eq!(rows[0].roi, Some(1.0));
        // zero revenue means zero cost, which maps to zero ROI
        assert_eq!(rows[2].roi, Some(0.0));

        let mut no_cost = sample();
        no_cost.iter_mut().for_each(|c| c.program_cost = None);
        let rows = derive(&no_cost, &CostModel::Supplied);
        assert!(rows.iter().all(|r| r.roi.is_none()));
        assert_eq!(kpis(&rows).avg_roi, None);
    }

    #[test]
    fn kpis_sum_and_average() {
        let rows = derive(&sample(), &CostModel::Supplied);
        let kpis = kpis(&rows);
        assert_eq!(kpis.course_count, 4);
        assert_eq!(kpis.total_revenue, 11600.0);
        assert_eq!(kpis.total_participants, 240);
        assert!((kpis.avg_satisfaction.unwrap() - 4.175).abs() < 1e-9);
    }

    #[test]
    fn derived_rows_serialize_with_derived_columns() {
        let rows = derive(&sample(), &CostModel::Supplied);
        let value = serde_json::to_value(&rows[0]).expect("serialize");
        assert_eq!(value["course_name"], "Rust Basics");
        assert_eq!(value["revenue_per_participant"], 50.0);
        assert_eq!(value["roi"], 1.0);
        assert_eq!(value["adoption_score"], 1.0);
    }

    #[test]
    fn kpis_of_empty_table_report_no_data() {
        let kpis = kpis(&[]);
        assert_eq!(kpis.course_count, 0);
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.total_participants, 0);
        assert_eq!(kpis.avg_satisfaction, None);
        assert_eq!(kpis.avg_revenue_per_participant, None);
        assert_eq!(kpis.avg_roi, None);
        assert_eq!(kpis.avg_engagement_index, None);
    }

    #[test]
    fn quadrants_cover_every_row() {
        let rows = derive(&sample(), &CostModel::Supplied);
        let counts = quadrants(&rows);
        assert_eq!(counts.total(), rows.len());
        // median revenue 2800, median satisfaction 4.35
        assert_eq!(counts.high_revenue_high_satisfaction, 1);
        assert_eq!(counts.high_revenue_low_satisfaction, 1);
        assert_eq!(counts.low_revenue_high_satisfaction, 1);
        assert_eq!(counts.low_revenue_low_satisfaction, 1);
        assert_eq!(quadrants(&[]).total(), 0);
    }

    #[test]
    fn median_ties_count_as_high() {
        let rows = derive(
            &[
                course("A", "Data", 1, 100.0, 4.0),
                course("B", "Data", 1, 100.0, 4.0),
                course("C", "Data", 1, 100.0, 4.0),
            ],
            &CostModel::Supplied,
        );
        assert_eq!(quadrants(&rows).high_revenue_high_satisfaction, 3);
    }

    #[test]
    fn subjects_sorted_by_revenue() {
        let rows = derive(&sample(), &CostModel::Supplied);
        let subjects = by_subject(&rows);
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].subject, "Software");
        assert_eq!(subjects[0].course_count, 2);
        assert_eq!(subjects[0].total_revenue, 9200.0);
        assert!((subjects[1].avg_satisfaction - 4.0).abs() < 1e-9);
    }

    #[test]
    fn top_by_orders_descending() {
        let rows = derive(&sample(), &CostModel::Supplied);
        let top: Vec<&str> = top_by(&rows, RankBy::RevenuePerParticipant, 2)
            .into_iter()
            .map(|r| r.course_name.as_str())
            .collect();
        assert_eq!(top, vec!["Async Rust", "Rust Basics"]);
        assert_eq!(top_by(&rows, RankBy::Revenue, 10).len(), 4);
    }
}
