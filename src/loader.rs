use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{CourseRecord, Metric, SeriesPoint};

const COURSE_COLUMNS: [&str; 6] = [
    "course_name",
    "price",
    "participants",
    "revenue",
    "satisfaction",
    "num_reviews",
];

const SERIES_COLUMNS: [&str; 4] = [
    "course_name",
    "month",
    "revenue_monthly",
    "participants_monthly",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("invalid month '{value}' in {}", path.display())]
    InvalidMonth { path: PathBuf, value: String },
    #[error("{} row {row}: {column} = {value} is out of range", path.display())]
    InvalidValue {
        path: PathBuf,
        row: usize,
        column: &'static str,
        value: f64,
    },
}

fn open(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

fn require_columns(
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
    columns: &[&'static str],
) -> Result<csv::StringRecord, LoadError> {
    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    for &column in columns {
        if !headers.iter().any(|header| header == column) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    Ok(headers)
}

/// Rejects non-finite values and values outside `range`. `row` counts the header as row 1.
fn check_range(
    path: &Path,
    row: usize,
    column: &'static str,
    value: f64,
    range: RangeInclusive<f64>,
) -> Result<(), LoadError> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(LoadError::InvalidValue {
            path: path.to_path_buf(),
            row,
            column,
            value,
        })
    }
}

fn check_course(path: &Path, row: usize, record: &CourseRecord) -> Result<(), LoadError> {
    check_range(path, row, "price", record.price, 0.0..=f64::MAX)?;
    check_range(path, row, "revenue", record.revenue, 0.0..=f64::MAX)?;
    check_range(path, row, "satisfaction", record.satisfaction, 0.0..=5.0)?;
    if let Some(cost) = record.program_cost {
        check_range(path, row, "program_cost", cost, 0.0..=f64::MAX)?;
    }
    Ok(())
}

/// Reads the course table, dropping rows whose subject is listed in `exclude_subjects`.
pub fn load_courses(
    path: &Path,
    exclude_subjects: &[String],
) -> Result<Vec<CourseRecord>, LoadError> {
    let mut reader = open(path)?;
    let headers = require_columns(&mut reader, path, &COURSE_COLUMNS)?;
    if !headers
        .iter()
        .any(|header| header == "subject" || header == "category")
    {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: "subject",
        });
    }

    let mut courses = Vec::new();
    let mut excluded = 0usize;
    for (index, result) in reader.deserialize::<CourseRecord>().enumerate() {
        let record = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        check_course(path, index + 2, &record)?;
        if exclude_subjects.iter().any(|s| s == &record.subject) {
            excluded += 1;
            continue;
        }
        courses.push(record);
    }

    tracing::info!(
        path = %path.display(),
        rows = courses.len(),
        excluded,
        "loaded course table"
    );
    Ok(courses)
}

pub fn load_series(path: &Path) -> Result<Vec<SeriesPoint>, LoadError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        course_name: String,
        month: String,
        revenue_monthly: f64,
        participants_monthly: f64,
    }

    let mut reader = open(path)?;
    require_columns(&mut reader, path, &SERIES_COLUMNS)?;

    let mut points = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = index + 2;
        check_range(path, line, "revenue_monthly", row.revenue_monthly, 0.0..=f64::MAX)?;
        check_range(
            path,
            line,
            "participants_monthly",
            row.participants_monthly,
            0.0..=f64::MAX,
        )?;
        let month = parse_month(&row.month).ok_or_else(|| LoadError::InvalidMonth {
            path: path.to_path_buf(),
            value: row.month.clone(),
        })?;
        points.push(SeriesPoint {
            course_name: row.course_name,
            month,
            revenue_monthly: row.revenue_monthly,
            participants_monthly: row.participants_monthly,
        });
    }

    tracing::info!(path = %path.display(), points = points.len(), "loaded monthly series");
    Ok(points)
}

/// Accepts `YYYY-MM-DD` or `YYYY-MM` (first of the month).
pub fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d"))
        .ok()
}

pub fn course_names(points: &[SeriesPoint]) -> Vec<String> {
    let mut names: Vec<String> = points.iter().map(|p| p.course_name.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// The chronologically sorted series of one course for the chosen metric.
pub fn series_for(points: &[SeriesPoint], course: &str, metric: Metric) -> Vec<(NaiveDate, f64)> {
    let mut series: Vec<(NaiveDate, f64)> = points
        .iter()
        .filter(|p| p.course_name == course)
        .map(|p| (p.month, metric.value_of(p)))
        .collect();
    series.sort_by_key(|(month, _)| *month);
    series
}
