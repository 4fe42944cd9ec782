//! Data models for the feedback analytics client.
//!
//! This module contains the raw records fetched from the backend, the
//! analytics payload, the derived per-course view, and the topic
//! analysis request/result shapes. Field names on wire types are
//! load-bearing and match the backend's JSON exactly.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a course; the join key across every aggregate mapping.
pub type CourseKey = String;

/// Status label the backend uses for a course whose topics were extracted.
pub const SUCCESS_STATUS: &str = "Success";

/// Deserialize a field, falling back to its default when the value is
/// missing, null, or has an unexpected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserialize a course-keyed mapping, keeping every entry whose value
/// parses and dropping the rest. A non-object yields an empty mapping.
fn lenient_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<CourseKey, V>, D::Error>
where
    D: Deserializer<'de>,
    V: DeserializeOwned,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(course, value)| Some((course, serde_json::from_value(value).ok()?)))
        .collect())
}

/// Deserialize a sequence, keeping every element that parses and dropping
/// the rest. A non-array yields an empty sequence.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Sentiment label attached to a piece of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// Fixed display order used by every sentiment breakdown.
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ];

    /// Label as it appears in the backend's distribution mappings.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Positive => "Positive",
        }
    }

    /// Display color token for charts.
    pub fn color(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "#EF4444",
            SentimentLabel::Neutral => "#F59E0B",
            SentimentLabel::Positive => "#10B981",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single student feedback submission as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Database identifier, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Course the feedback belongs to.
    pub course: CourseKey,
    /// Star rating, 1 to 5.
    pub rating: i32,
    /// Free-text feedback.
    pub feedback_text: String,
    /// Derived sentiment, when already computed.
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment_label: Option<SentimentLabel>,
    /// Submission date (ISO 8601), when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_submitted: Option<String>,
}

/// One row of the cross-course monthly rating series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRatingRow {
    #[serde(default)]
    pub course: CourseKey,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub average_rating: f64,
}

/// One row of the cross-course monthly sentiment series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySentimentRow {
    #[serde(default)]
    pub course: CourseKey,
    #[serde(default)]
    pub month: String,
    #[serde(rename = "Negative", default, deserialize_with = "lenient")]
    pub negative: u64,
    #[serde(rename = "Neutral", default, deserialize_with = "lenient")]
    pub neutral: u64,
    #[serde(rename = "Positive", default, deserialize_with = "lenient")]
    pub positive: u64,
}

/// Raw analytics payload from `GET /api/analysis`.
///
/// Every field tolerates absence or a malformed value by falling back to
/// an empty mapping or sequence. A malformed entry inside a mapping or
/// sequence is dropped on its own; the other entries are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsPayload {
    /// Per-course summary text.
    #[serde(default, deserialize_with = "lenient_map")]
    pub summary: BTreeMap<CourseKey, String>,
    /// Per-course average rating.
    #[serde(default, deserialize_with = "lenient_map")]
    pub average_rating: BTreeMap<CourseKey, f64>,
    /// Per-course counts keyed by sentiment label.
    #[serde(default, deserialize_with = "lenient_map")]
    pub sentiment_distribution: BTreeMap<CourseKey, BTreeMap<String, u64>>,
    /// Monthly sentiment counts across all courses.
    #[serde(default, deserialize_with = "lenient_seq")]
    pub sentiment_monthly: Vec<MonthlySentimentRow>,
    /// Monthly average ratings across all courses.
    #[serde(default, deserialize_with = "lenient_seq")]
    pub rating_monthly: Vec<MonthlyRatingRow>,
    /// Per-course view counts.
    #[serde(default, deserialize_with = "lenient_map")]
    pub views: BTreeMap<CourseKey, u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_feedback: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub active_courses: Option<u64>,
    /// Raw feedback records, when included.
    #[serde(default, deserialize_with = "lenient_seq")]
    pub feedback_data: Vec<FeedbackRecord>,
}

/// One slice of the fixed three-way sentiment breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentSlice {
    pub name: SentimentLabel,
    pub value: u64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingPoint {
    pub month: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentimentPoint {
    pub month: String,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

/// Normalized analytics for a single course, rebuilt on every selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalyticsView {
    /// Raw average rating; rounding is left to the renderer.
    pub avg_rating: f64,
    /// Sum of the course's sentiment distribution.
    pub total_reviews: u64,
    /// Always three slices, ordered Negative, Neutral, Positive.
    pub sentiment: Vec<SentimentSlice>,
    pub monthly_rating: Vec<RatingPoint>,
    pub monthly_sentiment: Vec<SentimentPoint>,
    pub summary_text: String,
    pub views: u64,
}

/// One row of the all-courses performance overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseOverviewRow {
    pub course: CourseKey,
    pub avg_rating: f64,
    pub total_reviews: u64,
}

/// Headline counts shown next to the topic analysis controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total_feedback: u64,
    pub active_courses: u64,
}

/// Body of `POST /api/analyze_topics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRequest {
    pub feedback: Vec<FeedbackRecord>,
    pub min_feedback_count: usize,
}

/// A single extracted topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default, deserialize_with = "lenient")]
    pub topic_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub examples: Vec<String>,
}

/// Per-course outcome of a topic analysis run.
#[derive(Debug, Clone, PartialEq)]
pub enum CourseTopicOutcome {
    /// Topics were extracted, in the backend's ranking order.
    Success { topics: Vec<Topic> },
    /// The backend could not produce topics for this course.
    Unavailable {
        status: String,
        reason: Option<String>,
    },
}

impl CourseTopicOutcome {
    /// Interpret one value of the result mapping.
    ///
    /// Only `status == "Success"` with a proper `topics` array counts as a
    /// success; anything else is reported with its status label.
    pub fn from_value(value: &Value) -> Self {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");

        if status == SUCCESS_STATUS {
            if let Some(Value::Array(items)) = value.get("topics") {
                let topics = items
                    .iter()
                    .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
                    .collect();
                return CourseTopicOutcome::Success { topics };
            }
        }

        CourseTopicOutcome::Unavailable {
            status: status.to_string(),
            reason: value
                .get("reason")
                .and_then(Value::as_str)
                .map(String::from),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CourseTopicOutcome::Success { .. })
    }
}

/// Result of a topic analysis run, keyed by course.
pub type AnalysisResult = BTreeMap<CourseKey, CourseTopicOutcome>;

/// Parse an analysis response body.
///
/// Fails only when the top-level course mapping cannot be parsed; malformed
/// per-course entries degrade to [`CourseTopicOutcome::Unavailable`].
pub fn parse_analysis_result(body: &str) -> Result<AnalysisResult, serde_json::Error> {
    let raw: BTreeMap<CourseKey, Value> = serde_json::from_str(body)?;
    Ok(raw
        .into_iter()
        .map(|(course, value)| {
            let outcome = CourseTopicOutcome::from_value(&value);
            (course, outcome)
        })
        .collect())
}

/// Errors raised when building a feedback submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("Course must not be empty")]
    EmptyCourse,
    #[error("Feedback text must not be empty")]
    EmptyText,
}

/// Body of `POST /api/submit_feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackSubmission {
    pub course: CourseKey,
    pub rating: u8,
    pub feedback_text: String,
}

impl FeedbackSubmission {
    /// Build a validated submission.
    pub fn new(course: &str, rating: i64, feedback_text: &str) -> Result<Self, SubmissionError> {
        let course = course.trim();
        if course.is_empty() {
            return Err(SubmissionError::EmptyCourse);
        }
        if !(1..=5).contains(&rating) {
            return Err(SubmissionError::RatingOutOfRange(rating));
        }
        if feedback_text.trim().is_empty() {
            return Err(SubmissionError::EmptyText);
        }

        Ok(Self {
            course: course.to_string(),
            rating: rating as u8,
            feedback_text: feedback_text.to_string(),
        })
    }
}
