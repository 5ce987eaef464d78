use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::CourseRecord;

/// How a course's program cost is obtained for ROI.
///
/// Only `Supplied` reflects real cost data. `Ratio` and `Seeded` are stand-ins
/// and every ROI figure built on them must be labelled as estimated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostModel {
    Supplied,
    Ratio(f64),
    Seeded { seed: u64, low: f64, high: f64 },
}

impl CostModel {
    pub const DEFAULT_SEED: u64 = 42;

    /// A random 40-70% of revenue per course, reproducible for a given seed.
    pub fn seeded(seed: u64) -> Self {
        CostModel::Seeded {
            seed,
            low: 0.4,
            high: 0.7,
        }
    }

    pub fn is_authoritative(&self) -> bool {
        matches!(self, CostModel::Supplied)
    }

    pub fn describe(&self) -> String {
        match self {
            CostModel::Supplied => "program_cost column".to_string(),
            CostModel::Ratio(ratio) => format!("estimated at {:.1}% of revenue", ratio * 100.0),
            CostModel::Seeded { seed, low, high } => format!(
                "estimated at a random {:.0}-{:.0}% of revenue (seed {seed})",
                low * 100.0,
                high * 100.0
            ),
        }
    }

    /// One cost per course, in table order. Rows without a cost get `None`.
    pub fn costs(&self, courses: &[CourseRecord]) -> Vec<Option<f64>> {
        match *self {
            CostModel::Supplied => courses.iter().map(|c| c.program_cost).collect(),
            CostModel::Ratio(ratio) => courses.iter().map(|c| Some(c.revenue * ratio)).collect(),
            CostModel::Seeded { seed, low, high } => {
                let mut rng = StdRng::seed_from_u64(seed);
                courses
                    .iter()
                    .map(|c| {
                        let fraction = if high > low {
                            rng.gen_range(low..high)
                        } else {
                            low
                        };
                        Some(c.revenue * fraction)
                    })
                    .collect()
            }
        }
    }
}

/// `(revenue - cost) / cost`, or 0 when the cost is zero.
pub fn roi(revenue: f64, cost: f64) -> f64 {
    if cost > 0.0 {
        (revenue - cost) / cost
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(revenue: f64, program_cost: Option<f64>) -> CourseRecord {
        CourseRecord {
            course_name: "Course".to_string(),
            subject: "Data".to_string(),
            price: 10.0,
            participants: 10,
            revenue,
            satisfaction: 4.0,
            num_reviews: 2,
            program_cost,
        }
    }

    #[test]
    fn supplied_costs_pass_through() {
        let courses = vec![course(100.0, Some(80.0)), course(50.0, None)];
        assert_eq!(CostModel::Supplied.costs(&courses), vec![Some(80.0), None]);
    }

    #[test]
    fn ratio_scales_revenue() {
        let courses = vec![course(200.0, None)];
        assert_eq!(CostModel::Ratio(0.625).costs(&courses), vec![Some(125.0)]);
    }

    #[test]
    fn seeded_costs_are_deterministic_and_in_range() {
        let courses: Vec<_> = (1..=20).map(|i| course(i as f64 * 100.0, None)).collect();
        let model = CostModel::seeded(CostModel::DEFAULT_SEED);
        let first = model.costs(&courses);
        assert_eq!(first, model.costs(&courses));
        for (cost, c) in first.iter().zip(&courses) {
            let fraction = cost.unwrap() / c.revenue;
            assert!((0.4..0.7).contains(&fraction));
        }
        assert!(!model.is_authoritative());
    }

    #[test]
    fn zero_cost_yields_zero_roi() {
        assert_eq!(roi(100.0, 0.0), 0.0);
        assert!((roi(150.0, 100.0) - 0.5).abs() < 1e-12);
    }
}
