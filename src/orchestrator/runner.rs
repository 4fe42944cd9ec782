//! Drives analysis runs against a topic-analysis backend.

use crate::analysis::CourseFilter;
use crate::client::ApiError;
use crate::models::{AnalysisResult, FeedbackRecord, TopicRequest};
use crate::orchestrator::state::{reduce, AnalysisRun, RunEvent};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// The external "run topic analysis" operation.
#[async_trait]
pub trait TopicAnalyzer: Send + Sync {
    async fn analyze_topics(&self, request: &TopicRequest) -> Result<AnalysisResult, ApiError>;
}

/// Owns one [`AnalysisRun`] and the backend it submits to.
///
/// A run can be driven in one step with [`Orchestrator::start_run`], or in
/// two with [`Orchestrator::begin_run`] and [`Orchestrator::complete_run`]
/// when the caller manages the in-flight request itself.
pub struct Orchestrator<A> {
    analyzer: A,
    run: AnalysisRun,
}

impl<A: TopicAnalyzer> Orchestrator<A> {
    pub fn new(analyzer: A, minimum_sample_count: usize) -> Self {
        Self {
            analyzer,
            run: AnalysisRun::new(minimum_sample_count),
        }
    }

    /// Current run state.
    pub fn run(&self) -> &AnalysisRun {
        &self.run
    }

    fn dispatch(&mut self, event: RunEvent<'_>) -> Option<TopicRequest> {
        let run = std::mem::take(&mut self.run);
        let (next, request) = reduce(run, event);
        self.run = next;
        request
    }

    pub fn set_course_filter(&mut self, filter: CourseFilter) {
        self.dispatch(RunEvent::CourseSelected(filter));
    }

    pub fn set_minimum_sample_count(&mut self, n: usize) {
        self.dispatch(RunEvent::MinimumSampleSet(n));
    }

    /// Clear a finished run's notice.
    pub fn dismiss(&mut self) {
        self.dispatch(RunEvent::Dismissed);
    }

    /// Validate and, if the subset is large enough, mark the run as running.
    ///
    /// Returns the request to send, or `None` when the run is already in
    /// flight or failed validation.
    pub fn begin_run(&mut self, all_feedback: &[FeedbackRecord]) -> Option<TopicRequest> {
        self.dispatch(RunEvent::RunRequested(all_feedback))
    }

    /// Record the outcome of the request returned by [`Self::begin_run`].
    pub fn complete_run(
        &mut self,
        request: &TopicRequest,
        outcome: Result<AnalysisResult, ApiError>,
    ) {
        match outcome {
            Ok(result) => {
                let missing = missing_courses(request, &result);
                if !missing.is_empty() {
                    warn!("Analysis result has no entry for: {}", missing.join(", "));
                }
                info!("Topic analysis returned {} courses", result.len());
                self.dispatch(RunEvent::AnalysisSucceeded(result));
            }
            Err(e) => {
                warn!("Topic analysis failed: {}", e);
                self.dispatch(RunEvent::AnalysisFailed(e.to_string()));
            }
        }
    }

    /// Run the full workflow once over `all_feedback`.
    pub async fn start_run(&mut self, all_feedback: &[FeedbackRecord]) -> &AnalysisRun {
        if let Some(request) = self.begin_run(all_feedback) {
            let outcome = self.analyzer.analyze_topics(&request).await;
            self.complete_run(&request, outcome);
        }
        &self.run
    }
}

/// Courses present in the request but absent from the result.
fn missing_courses(request: &TopicRequest, result: &AnalysisResult) -> Vec<String> {
    let requested: BTreeSet<&str> = request
        .feedback
        .iter()
        .map(|record| record.course.as_str())
        .collect();

    requested
        .into_iter()
        .filter(|course| !result.contains_key(*course))
        .map(String::from)
        .collect()
}
