//! Course analytics aggregation.
//!
//! This module turns the raw analytics payload into the normalized,
//! per-course view consumed by the renderers. Every lookup degrades to an
//! empty or zero default; nothing here can fail.

use crate::analysis::filter::rows_for_course;
use crate::models::{
    AnalyticsPayload, CourseAnalyticsView, CourseKey, CourseOverviewRow, FeedbackStats,
    RatingPoint, SentimentLabel, SentimentPoint, SentimentSlice,
};
use std::collections::{BTreeMap, HashSet};

/// Look up a course in an aggregate mapping, defaulting when absent.
pub fn lookup_or_default<V: Clone + Default>(map: &BTreeMap<CourseKey, V>, course: &str) -> V {
    map.get(course).cloned().unwrap_or_default()
}

/// Total reviews for a distribution: the sum of all its counts.
pub fn total_reviews(distribution: &BTreeMap<String, u64>) -> u64 {
    distribution.values().sum()
}

/// Three-way sentiment breakdown in fixed order, zero-filled.
pub fn sentiment_breakdown(distribution: &BTreeMap<String, u64>) -> Vec<SentimentSlice> {
    SentimentLabel::ALL
        .iter()
        .map(|label| SentimentSlice {
            name: *label,
            value: distribution.get(label.as_str()).copied().unwrap_or(0),
            color: label.color(),
        })
        .collect()
}

/// Build the analytics view for one course.
pub fn derive_course_view(payload: &AnalyticsPayload, course: &str) -> CourseAnalyticsView {
    let distribution = lookup_or_default(&payload.sentiment_distribution, course);

    let monthly_rating = rows_for_course(&payload.rating_monthly, course)
        .map(|row| RatingPoint {
            month: row.month.clone(),
            rating: row.average_rating,
        })
        .collect();

    let monthly_sentiment = rows_for_course(&payload.sentiment_monthly, course)
        .map(|row| SentimentPoint {
            month: row.month.clone(),
            positive: row.positive,
            neutral: row.neutral,
            negative: row.negative,
        })
        .collect();

    CourseAnalyticsView {
        avg_rating: lookup_or_default(&payload.average_rating, course),
        total_reviews: total_reviews(&distribution),
        sentiment: sentiment_breakdown(&distribution),
        monthly_rating,
        monthly_sentiment,
        summary_text: lookup_or_default(&payload.summary, course),
        views: lookup_or_default(&payload.views, course),
    }
}

/// Course keys listed in the payload, in iteration order of `summary`.
pub fn course_keys(payload: &AnalyticsPayload) -> Vec<CourseKey> {
    payload.summary.keys().cloned().collect()
}

/// Course selected when nothing else has been chosen.
pub fn default_course(payload: &AnalyticsPayload) -> Option<CourseKey> {
    payload.summary.keys().next().cloned()
}

/// Rating and review totals for every course in the payload.
pub fn course_overview(payload: &AnalyticsPayload) -> Vec<CourseOverviewRow> {
    course_keys(payload)
        .into_iter()
        .map(|course| {
            let distribution = lookup_or_default(&payload.sentiment_distribution, &course);
            CourseOverviewRow {
                avg_rating: lookup_or_default(&payload.average_rating, &course),
                total_reviews: total_reviews(&distribution),
                course,
            }
        })
        .collect()
}

/// Headline counts, preferring the backend's totals over local counting.
pub fn feedback_stats(payload: &AnalyticsPayload) -> FeedbackStats {
    let total_feedback = payload
        .total_feedback
        .unwrap_or(payload.feedback_data.len() as u64);

    let active_courses = payload.active_courses.unwrap_or_else(|| {
        let distinct: HashSet<&str> = payload
            .feedback_data
            .iter()
            .map(|record| record.course.as_str())
            .collect();
        distinct.len() as u64
    });

    FeedbackStats {
        total_feedback,
        active_courses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedbackRecord, MonthlyRatingRow, MonthlySentimentRow};

    fn fixture() -> AnalyticsPayload {
        serde_json::from_str(include_str!("../../fixtures/analysis_payload.json")).unwrap()
    }

    fn distribution(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect()
    }

    #[test]
    fn test_absent_course_yields_zeroed_view() {
        let payload = fixture();
        let view = derive_course_view(&payload, "NOPE999");

        assert_eq!(view.total_reviews, 0);
        assert_eq!(view.avg_rating, 0.0);
        assert_eq!(view.views, 0);
        assert!(view.summary_text.is_empty());
        assert!(view.monthly_rating.is_empty());
        assert!(view.monthly_sentiment.is_empty());

        let names: Vec<_> = view.sentiment.iter().map(|s| s.name).collect();
        assert_eq!(names, SentimentLabel::ALL.to_vec());
        assert!(view.sentiment.iter().all(|s| s.value == 0));
    }

    #[test]
    fn test_empty_payload_yields_zeroed_view() {
        let view = derive_course_view(&AnalyticsPayload::default(), "CS101");
        assert_eq!(view.total_reviews, 0);
        assert_eq!(view.sentiment.len(), 3);
    }

    #[test]
    fn test_cs101_end_to_end() {
        let payload = fixture();
        let view = derive_course_view(&payload, "CS101");

        assert_eq!(view.total_reviews, 15);
        assert_eq!(view.avg_rating, 4.2);
        assert_eq!(view.views, 128);
        assert!(view.summary_text.contains("hands-on labs"));

        let slices: Vec<_> = view
            .sentiment
            .iter()
            .map(|s| (s.name.as_str(), s.value, s.color))
            .collect();
        assert_eq!(
            slices,
            vec![
                ("Negative", 2, "#EF4444"),
                ("Neutral", 3, "#F59E0B"),
                ("Positive", 10, "#10B981"),
            ]
        );
    }

    #[test]
    fn test_missing_label_is_zero_filled() {
        let payload = fixture();
        let view = derive_course_view(&payload, "MATH200");

        assert_eq!(view.total_reviews, 5);
        assert_eq!(view.sentiment[2].value, 0);
        assert_eq!(view.monthly_sentiment[0].positive, 0);
        assert_eq!(view.monthly_sentiment[0].negative, 3);
    }

    #[test]
    fn test_total_reviews_is_distribution_sum() {
        let cases = [
            vec![],
            vec![("Positive", 7)],
            vec![("Negative", 1), ("Neutral", 0), ("Positive", 2)],
            vec![("Negative", 100), ("Neutral", 250), ("Positive", 3)],
        ];

        for entries in cases {
            let dist = distribution(&entries);
            let expected: u64 = entries.iter().map(|(_, c)| c).sum();
            assert_eq!(total_reviews(&dist), expected);

            let mut payload = AnalyticsPayload::default();
            payload.sentiment_distribution.insert("X".to_string(), dist);
            assert_eq!(derive_course_view(&payload, "X").total_reviews, expected);
        }
    }

    #[test]
    fn test_unrecognised_labels_count_towards_total_only() {
        let dist = distribution(&[("Positive", 2), ("Mixed", 3)]);
        assert_eq!(total_reviews(&dist), 5);
        let slices = sentiment_breakdown(&dist);
        assert_eq!(slices.iter().map(|s| s.value).sum::<u64>(), 2);
    }

    #[test]
    fn test_monthly_rating_is_course_exact() {
        let payload = AnalyticsPayload {
            rating_monthly: vec![
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
            ],
            ..AnalyticsPayload::default()
        };

        let view = derive_course_view(&payload, "A");
        assert_eq!(
            view.monthly_rating,
            vec![RatingPoint {
                month: "Jan".to_string(),
                rating: 4.2
            }]
        );
    }

    #[test]
    fn test_monthly_series_preserve_source_order() {
        let payload = AnalyticsPayload {
            sentiment_monthly: vec![
                MonthlySentimentRow {
                    course: "A".to_string(),
                    month: "Mar".to_string(),
                    negative: 0,
                    neutral: 1,
                    positive: 2,
                },
                MonthlySentimentRow {
                    course: "A".to_string(),
                    month: "Jan".to_string(),
                    negative: 1,
                    neutral: 0,
                    positive: 0,
                },
            ],
            ..AnalyticsPayload::default()
        };

        let months: Vec<_> = derive_course_view(&payload, "A")
            .monthly_sentiment
            .into_iter()
            .map(|p| p.month)
            .collect();
        assert_eq!(months, vec!["Mar", "Jan"]);
    }

    #[test]
    fn test_course_overview_and_default_course() {
        let payload = fixture();
        assert_eq!(default_course(&payload), Some("CS101".to_string()));
        assert_eq!(default_course(&AnalyticsPayload::default()), None);

        let overview = course_overview(&payload);
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].course, "CS101");
        assert_eq!(overview[0].total_reviews, 15);
        assert_eq!(overview[1].course, "MATH200");
        assert_eq!(overview[1].avg_rating, 3.1);
    }

    #[test]
    fn test_feedback_stats_fallback_counts() {
        assert_eq!(
            feedback_stats(&fixture()),
            FeedbackStats {
                total_feedback: 6,
                active_courses: 2
            }
        );

        let payload = AnalyticsPayload {
            feedback_data: vec![
                FeedbackRecord {
                    id: None,
                    course: "A".to_string(),
                    rating: 5,
                    feedback_text: "good".to_string(),
                    sentiment_label: None,
                    date_submitted: None,
                },
                FeedbackRecord {
                    id: None,
                    course: "B".to_string(),
                    rating: 2,
                    feedback_text: "meh".to_string(),
                    sentiment_label: None,
                    date_submitted: None,
                },
            ],
            ..AnalyticsPayload::default()
        };
        assert_eq!(
            feedback_stats(&payload),
            FeedbackStats {
                total_feedback: 2,
                active_courses: 2
            }
        );
    }
}
