//! Course-key filtering shared by the aggregator and the orchestrator.
//!
//! Matching is always exact on the course key. The orchestrator filters
//! feedback records by a [`CourseFilter`]; the aggregator narrows the
//! cross-course monthly series with [`rows_for_course`].

use crate::models::{CourseKey, FeedbackRecord, MonthlyRatingRow, MonthlySentimentRow};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Keyword selecting every course.
pub const ALL_COURSES: &str = "all";

/// Anything that belongs to a single course.
pub trait CourseKeyed {
    fn course_key(&self) -> &str;
}

impl CourseKeyed for FeedbackRecord {
    fn course_key(&self) -> &str {
        &self.course
    }
}

impl CourseKeyed for MonthlyRatingRow {
    fn course_key(&self) -> &str {
        &self.course
    }
}

impl CourseKeyed for MonthlySentimentRow {
    fn course_key(&self) -> &str {
        &self.course
    }
}

/// Course selection for an analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CourseFilter {
    /// Every course.
    #[default]
    All,
    /// Exactly one course.
    Course(CourseKey),
}

impl CourseFilter {
    /// Whether a course key passes this filter.
    pub fn matches(&self, course: &str) -> bool {
        match self {
            CourseFilter::All => true,
            CourseFilter::Course(key) => key == course,
        }
    }

    /// Keep the rows that pass this filter, preserving source order.
    pub fn apply<T: CourseKeyed + Clone>(&self, rows: &[T]) -> Vec<T> {
        rows.iter()
            .filter(|row| self.matches(row.course_key()))
            .cloned()
            .collect()
    }
}

impl From<&str> for CourseFilter {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL_COURSES) || s.is_empty() {
            CourseFilter::All
        } else {
            CourseFilter::Course(s.to_string())
        }
    }
}

impl FromStr for CourseFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CourseFilter::from(s))
    }
}

impl fmt::Display for CourseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseFilter::All => write!(f, "{}", ALL_COURSES),
            CourseFilter::Course(key) => write!(f, "{}", key),
        }
    }
}

/// Rows belonging to exactly `course`, in source order.
pub fn rows_for_course<'a, T: CourseKeyed>(
    rows: &'a [T],
    course: &'a str,
) -> impl Iterator<Item = &'a T> + 'a {
    rows.iter().filter(move |row| row.course_key() == course)
}

/// Distinct courses with their record counts, in first-seen order.
pub fn course_counts(records: &[FeedbackRecord]) -> Vec<(CourseKey, usize)> {
    let mut order: Vec<CourseKey> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let count = counts.entry(record.course.as_str()).or_insert(0);
        if *count == 0 {
            order.push(record.course.clone());
        }
        *count += 1;
    }

    order
        .into_iter()
        .map(|course| {
            let count = counts.get(course.as_str()).copied().unwrap_or(0);
            (course, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(course: &str) -> FeedbackRecord {
        FeedbackRecord {
            id: None,
            course: course.to_string(),
            rating: 4,
            feedback_text: format!("feedback for {}", course),
            sentiment_label: None,
            date_submitted: None,
        }
    }

    #[test]
    fn test_filter_from_str() {
        assert_eq!(CourseFilter::from("all"), CourseFilter::All);
        assert_eq!(CourseFilter::from("ALL"), CourseFilter::All);
        assert_eq!(
            CourseFilter::from("CS101"),
            CourseFilter::Course("CS101".to_string())
        );
        assert_eq!(CourseFilter::Course("CS101".to_string()).to_string(), "CS101");
        assert_eq!(CourseFilter::All.to_string(), "all");
    }

    #[test]
    fn test_apply_is_exact_and_ordered() {
        let records = vec![record("A"), record("AB"), record("B"), record("A")];

        let only_a = CourseFilter::Course("A".to_string()).apply(&records);
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|r| r.course == "A"));

        let everything = CourseFilter::All.apply(&records);
        assert_eq!(everything, records);
    }

    #[test]
    fn test_rows_for_course() {
        let rows = vec![
            MonthlyRatingRow {
                course: "A".to_string(),
                month: "Jan".to_string(),
                average_rating: 4.2,
            },
            MonthlyRatingRow {
                course: "B".to_string(),
                month: "Jan".to_string(),
                average_rating: 3.1,
            },
        ];

        let matched: Vec<_> = rows_for_course(&rows, "A").collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].average_rating, 4.2);
        assert_eq!(rows_for_course(&rows, "C").count(), 0);
    }

    #[test]
    fn test_course_counts_first_seen_order() {
        let records = vec![record("B"), record("A"), record("B"), record("C"), record("B")];
        let counts = course_counts(&records);
        assert_eq!(
            counts,
            vec![
                ("B".to_string(), 3),
                ("A".to_string(), 1),
                ("C".to_string(), 1)
            ]
        );
    }
}
