//! Markdown and JSON rendering.
//!
//! This module renders the derived course view, the course overview, and
//! shaped topic analysis results for the terminal or a file.

use crate::models::{CourseAnalyticsView, CourseOverviewRow, FeedbackStats};
use crate::orchestrator::{AnalysisRun, CourseTopicsSection, RunState, SectionBody};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Generate the Markdown dashboard for one course.
pub fn generate_course_markdown(
    course: &str,
    view: &CourseAnalyticsView,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Course Analytics: {}\n\n", course));
    output.push_str(&generate_timestamp_line(generated_at));

    output.push_str(&generate_metrics_section(view));

    if !view.summary_text.is_empty() {
        output.push_str("## Summary\n\n");
        output.push_str(&view.summary_text);
        output.push_str("\n\n");
    }

    output.push_str(&generate_sentiment_section(view));
    output.push_str(&generate_monthly_rating_section(view));
    output.push_str(&generate_monthly_sentiment_section(view));

    output
}

fn generate_timestamp_line(generated_at: DateTime<Utc>) -> String {
    format!(
        "*Generated on {}*\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Headline metrics. Rating is rounded to one decimal here.
fn generate_metrics_section(view: &CourseAnalyticsView) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str("| Average Rating | Total Reviews | Views |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {:.1} | {} | {} |\n\n",
        view.avg_rating, view.total_reviews, view.views
    ));

    section
}

fn generate_sentiment_section(view: &CourseAnalyticsView) -> String {
    let mut section = String::new();

    section.push_str("## Sentiment Distribution\n\n");
    section.push_str("| Sentiment | Count | Share |\n");
    section.push_str("|:---|:---:|:---:|\n");

    for slice in &view.sentiment {
        let share = if view.total_reviews > 0 {
            slice.value as f64 * 100.0 / view.total_reviews as f64
        } else {
            0.0
        };
        section.push_str(&format!(
            "| {} | {} | {:.0}% |\n",
            slice.name, slice.value, share
        ));
    }
    section.push('\n');

    section
}

fn generate_monthly_rating_section(view: &CourseAnalyticsView) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Rating Changes\n\n");
    if view.monthly_rating.is_empty() {
        section.push_str("No monthly ratings recorded.\n\n");
        return section;
    }

    section.push_str("| Month | Rating |\n");
    section.push_str("|:---|:---:|\n");
    for point in &view.monthly_rating {
        section.push_str(&format!("| {} | {:.2} |\n", point.month, point.rating));
    }
    section.push('\n');

    section
}

fn generate_monthly_sentiment_section(view: &CourseAnalyticsView) -> String {
    let mut section = String::new();

    section.push_str("## Monthly Sentiment Changes\n\n");
    if view.monthly_sentiment.is_empty() {
        section.push_str("No monthly sentiment recorded.\n\n");
        return section;
    }

    section.push_str("| Month | Positive | Neutral | Negative |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for point in &view.monthly_sentiment {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            point.month, point.positive, point.neutral, point.negative
        ));
    }
    section.push('\n');

    section
}

/// Generate the Markdown overview of every course.
pub fn generate_overview_markdown(
    rows: &[CourseOverviewRow],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    output.push_str("# Course Performance Summary\n\n");
    output.push_str(&generate_timestamp_line(generated_at));

    if rows.is_empty() {
        output.push_str("No course analytics available yet.\n");
        return output;
    }

    output.push_str("| Course | Average Rating | Reviews |\n");
    output.push_str("|:---|:---:|:---:|\n");
    for row in rows {
        output.push_str(&format!(
            "| {} | {:.1} | {} |\n",
            row.course, row.avg_rating, row.total_reviews
        ));
    }
    output.push('\n');

    output
}

/// Generate the Markdown report of a topic analysis run.
pub fn generate_topics_markdown(
    run: &AnalysisRun,
    stats: &FeedbackStats,
    sections: &[CourseTopicsSection],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    output.push_str("# Topic Analysis Results\n\n");
    if run.state == RunState::Succeeded {
        output.push_str(&format!(
            "*Analysis completed on {}*\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }

    output.push_str(&format!(
        "- **Course Selection:** {}\n- **Minimum Feedback Items:** {}\n- **Total Feedback:** {}\n- **Active Courses:** {}\n\n",
        run.selected_course, run.minimum_sample_count, stats.total_feedback, stats.active_courses
    ));

    if let Some(notice) = run.notice() {
        output.push_str(&format!("> **{}**\n\n", notice));
    }

    for section in sections {
        output.push_str(&generate_course_topics_section(section));
    }

    output
}

fn generate_course_topics_section(section: &CourseTopicsSection) -> String {
    let mut block = String::new();

    block.push_str(&format!("## {}\n\n", section.course));

    match &section.body {
        SectionBody::Topics { rows } if rows.is_empty() => {
            block.push_str("No topics found.\n\n");
        }
        SectionBody::Topics { rows } => {
            block.push_str("| Topic Name | Feedback Count | Top Keywords | Example Feedback |\n");
            block.push_str("|:---|:---:|:---|:---|\n");
            for row in rows {
                let example = match &row.example {
                    Some(text) => format!("\"{}...\"", escape_cell(text)),
                    None => "N/A".to_string(),
                };
                block.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    escape_cell(&row.topic_name),
                    row.count,
                    escape_cell(&row.keywords.join(", ")),
                    example
                ));
            }
            block.push('\n');
        }
        SectionBody::Unavailable { status, reason } => {
            block.push_str(&format!("**{}:** {}\n\n", status, reason));
        }
    }

    block
}

/// Keep free text from breaking a Markdown table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TopicsReport<'a> {
    state: String,
    course_selection: String,
    minimum_feedback_count: usize,
    input_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
    stats: &'a FeedbackStats,
    courses: &'a [CourseTopicsSection],
}

/// Generate the JSON report of a topic analysis run.
pub fn generate_topics_json(
    run: &AnalysisRun,
    stats: &FeedbackStats,
    sections: &[CourseTopicsSection],
) -> Result<String> {
    generate_json(&TopicsReport {
        state: run.state.to_string(),
        course_selection: run.selected_course.to_string(),
        minimum_feedback_count: run.minimum_sample_count,
        input_size: run.input_size,
        notice: run.notice(),
        stats,
        courses: sections,
    })
}

/// Serialize any rendered value as pretty JSON.
pub fn generate_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
