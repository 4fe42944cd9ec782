//! Display shaping for topic analysis results.
//!
//! Produces a summary view grouped by course. The stored result is never
//! modified.

use crate::models::{AnalysisResult, CourseKey, CourseTopicOutcome, Topic};
use serde::Serialize;

/// Keywords shown per topic.
pub const MAX_KEYWORDS: usize = 5;

/// Characters of the first example shown per topic.
pub const MAX_EXAMPLE_CHARS: usize = 100;

pub const DEFAULT_UNAVAILABLE_REASON: &str = "Unable to process this course.";

/// One topic line in a course section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicRow {
    pub topic_name: String,
    pub count: u64,
    pub keywords: Vec<String>,
    /// First example, truncated; `None` when the topic has no examples.
    pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionBody {
    Topics { rows: Vec<TopicRow> },
    Unavailable { status: String, reason: String },
}

/// Display section for one course of the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseTopicsSection {
    pub course: CourseKey,
    #[serde(flatten)]
    pub body: SectionBody,
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn topic_row(index: usize, topic: &Topic) -> TopicRow {
    TopicRow {
        topic_name: topic
            .topic_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Topic {}", index + 1)),
        count: topic.count,
        keywords: topic.keywords.iter().take(MAX_KEYWORDS).cloned().collect(),
        example: topic
            .examples
            .first()
            .map(|example| truncate_chars(example, MAX_EXAMPLE_CHARS)),
    }
}

/// Shape every course of a result for display, in key order.
pub fn shape_results(result: &AnalysisResult) -> Vec<CourseTopicsSection> {
    result
        .iter()
        .map(|(course, outcome)| {
            let body = match outcome {
                CourseTopicOutcome::Success { topics } => SectionBody::Topics {
                    rows: topics
                        .iter()
                        .enumerate()
                        .map(|(i, topic)| topic_row(i, topic))
                        .collect(),
                },
                CourseTopicOutcome::Unavailable { status, reason } => SectionBody::Unavailable {
                    status: status.clone(),
                    reason: reason
                        .clone()
                        .unwrap_or_else(|| DEFAULT_UNAVAILABLE_REASON.to_string()),
                },
            };
            CourseTopicsSection {
                course: course.clone(),
                body,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_analysis_result;

    fn sample() -> AnalysisResult {
        parse_analysis_result(include_str!("../../fixtures/topic_result.json")).unwrap()
    }

    #[test]
    fn test_keywords_and_examples_truncated() {
        let sections = shape_results(&sample());
        let cs101 = &sections[0];
        assert_eq!(cs101.course, "CS101");

        let SectionBody::Topics { rows } = &cs101.body else {
            panic!("expected topics for CS101");
        };
        assert_eq!(rows[0].keywords, vec!["pace", "fast", "lecture", "slides", "follow"]);
        let example = rows[0].example.as_ref().unwrap();
        assert_eq!(example.chars().count(), MAX_EXAMPLE_CHARS);
        assert!(example.starts_with("The lectures moved far too quickly"));

        assert_eq!(rows[1].keywords.len(), 2);
        assert_eq!(rows[1].example, None);
    }

    #[test]
    fn test_shaping_does_not_mutate_result() {
        let result = sample();
        let before = result.clone();
        let _ = shape_results(&result);
        assert_eq!(result, before);

        let Some(CourseTopicOutcome::Success { topics }) = result.get("CS101") else {
            panic!("expected success");
        };
        assert_eq!(topics[0].keywords.len(), 7);
    }

    #[test]
    fn test_unavailable_and_unnamed() {
        let sections = shape_results(&sample());

        assert_eq!(
            sections[1].body,
            SectionBody::Unavailable {
                status: "Skipped".to_string(),
                reason: "Not enough feedback (3 < 5)".to_string(),
            }
        );

        let SectionBody::Topics { rows } = &sections[2].body else {
            panic!("expected topics for PHYS150");
        };
        assert_eq!(rows[0].topic_name, "Topic 1");
        assert_eq!(rows[0].example.as_deref(), Some("Fun experiments."));
    }

    #[test]
    fn test_missing_reason_uses_default() {
        let mut result = AnalysisResult::new();
        result.insert(
            "X".to_string(),
            CourseTopicOutcome::Unavailable {
                status: "Error".to_string(),
                reason: None,
            },
        );
        let sections = shape_results(&result);
        assert_eq!(
            sections[0].body,
            SectionBody::Unavailable {
                status: "Error".to_string(),
                reason: DEFAULT_UNAVAILABLE_REASON.to_string(),
            }
        );
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
