use std::ops::RangeInclusive;

use crate::models::DerivedCourse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategorySelection {
    All,
    Only(String),
}

impl CategorySelection {
    pub fn from_arg(value: Option<String>) -> Self {
        match value {
            Some(subject) if subject != "All" => CategorySelection::Only(subject),
            _ => CategorySelection::All,
        }
    }

    fn admits(&self, subject: &str) -> bool {
        match self {
            CategorySelection::All => true,
            CategorySelection::Only(selected) => selected == subject,
        }
    }
}

/// One interaction's filter state. Every predicate is inclusive and all must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseFilter {
    pub price: RangeInclusive<f64>,
    pub satisfaction: RangeInclusive<f64>,
    pub category: CategorySelection,
}

impl CourseFilter {
    /// A filter spanning the observed price and satisfaction of `rows`; excludes nothing.
    pub fn spanning(rows: &[DerivedCourse]) -> Self {
        Self {
            price: observed(rows.iter().map(|r| r.price)),
            satisfaction: observed(rows.iter().map(|r| r.satisfaction)),
            category: CategorySelection::All,
        }
    }

    pub fn admits(&self, row: &DerivedCourse) -> bool {
        self.price.contains(&row.price)
            && self.satisfaction.contains(&row.satisfaction)
            && self.category.admits(&row.subject)
    }

    pub fn apply(&self, rows: &[DerivedCourse]) -> Vec<DerivedCourse> {
        let filtered: Vec<DerivedCourse> =
            rows.iter().filter(|row| self.admits(row)).cloned().collect();
        tracing::debug!(
            before = rows.len(),
            after = filtered.len(),
            filter = ?self,
            "applied course filter"
        );
        filtered
    }
}

fn observed(values: impl Iterator<Item = f64>) -> RangeInclusive<f64> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo > hi {
        0.0..=0.0
    } else {
        lo..=hi
    }
}
