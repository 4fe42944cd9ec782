//! Topic analysis run state and its reducer.
//!
//! All transitions go through [`reduce`], which takes the current run and
//! an event and returns the next run plus, when a run should start, the
//! request to send to the analysis backend. No I/O happens here.
//!
//! ```text
//! Idle -> Validating -> Running -> Succeeded | Failed
//!            |
//!            +-> Failed (insufficient data, no request sent)
//! ```

use crate::analysis::CourseFilter;
use crate::models::{AnalysisResult, FeedbackRecord, TopicRequest};
use std::fmt;
use tracing::{debug, warn};

/// Default minimum number of feedback items required to start a run.
pub const DEFAULT_MINIMUM_SAMPLE_COUNT: usize = 5;

/// Lifecycle state of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Validating => write!(f, "validating"),
            RunState::Running => write!(f, "running"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Why a run ended in [`RunState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// The filtered subset was smaller than the minimum sample count.
    InsufficientData { required: usize, found: usize },
    /// Transport, server, or response-parsing failure.
    Execution(String),
}

impl RunFailure {
    pub fn title(&self) -> &'static str {
        match self {
            RunFailure::InsufficientData { .. } => "Insufficient Data",
            RunFailure::Execution(_) => "Analysis Failed",
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::InsufficientData { required, found } => write!(
                f,
                "At least {} feedback items are required for analysis. Found {}.",
                required, found
            ),
            RunFailure::Execution(message) => write!(f, "{}", message),
        }
    }
}

/// One analysis run and the settings for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    pub state: RunState,
    pub selected_course: CourseFilter,
    pub minimum_sample_count: usize,
    /// Size of the subset considered by the latest run request.
    pub input_size: usize,
    pub result: Option<AnalysisResult>,
    pub failure: Option<RunFailure>,
}

impl Default for AnalysisRun {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_SAMPLE_COUNT)
    }
}

impl AnalysisRun {
    /// A fresh, idle run over all courses.
    pub fn new(minimum_sample_count: usize) -> Self {
        Self {
            state: RunState::Idle,
            selected_course: CourseFilter::All,
            minimum_sample_count: minimum_sample_count.max(1),
            input_size: 0,
            result: None,
            failure: None,
        }
    }

    /// User-facing error text for a failed run.
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }

    /// Status line for the latest run, if it has finished.
    pub fn notice(&self) -> Option<String> {
        match (self.state, &self.failure) {
            (RunState::Succeeded, _) => Some(format!(
                "Analysis Complete: Successfully processed {} feedback items.",
                self.input_size
            )),
            (RunState::Failed, Some(failure)) => {
                Some(format!("{}: {}", failure.title(), failure))
            }
            _ => None,
        }
    }
}

/// Inputs to the run state machine.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    /// Change the course filter for the next run.
    CourseSelected(CourseFilter),
    /// Change the minimum sample count for the next run.
    MinimumSampleSet(usize),
    /// Start a run over the given working set.
    RunRequested(&'a [FeedbackRecord]),
    /// The in-flight run returned a result.
    AnalysisSucceeded(AnalysisResult),
    /// The in-flight run failed.
    AnalysisFailed(String),
    /// Clear a finished run's notice and return to idle.
    Dismissed,
}

/// Apply an event to a run.
///
/// Returns the next run and, when the event starts a run, the request the
/// caller must send to the analysis backend.
pub fn reduce(mut run: AnalysisRun, event: RunEvent<'_>) -> (AnalysisRun, Option<TopicRequest>) {
    match event {
        RunEvent::CourseSelected(filter) => {
            run.selected_course = filter;
            (run, None)
        }
        RunEvent::MinimumSampleSet(n) => {
            if n == 0 {
                warn!("Ignoring minimum sample count of 0");
            } else {
                run.minimum_sample_count = n;
            }
            (run, None)
        }
        RunEvent::RunRequested(feedback) => request_run(run, feedback),
        RunEvent::AnalysisSucceeded(result) => {
            if run.state != RunState::Running {
                debug!("Dropping analysis result received while {}", run.state);
                return (run, None);
            }
            run.result = Some(result);
            run.state = RunState::Succeeded;
            debug!("Run state: running -> succeeded");
            (run, None)
        }
        RunEvent::AnalysisFailed(message) => {
            if run.state != RunState::Running {
                debug!("Dropping analysis failure received while {}", run.state);
                return (run, None);
            }
            run.failure = Some(RunFailure::Execution(message));
            run.state = RunState::Failed;
            debug!("Run state: running -> failed");
            (run, None)
        }
        RunEvent::Dismissed => {
            if run.state != RunState::Running {
                run.failure = None;
                run.state = RunState::Idle;
            }
            (run, None)
        }
    }
}

fn request_run(
    mut run: AnalysisRun,
    feedback: &[FeedbackRecord],
) -> (AnalysisRun, Option<TopicRequest>) {
    if run.state == RunState::Running {
        debug!("Run already in flight; ignoring request");
        return (run, None);
    }

    debug!("Run state: {} -> validating", run.state);
    run.state = RunState::Validating;

    let subset = run.selected_course.apply(feedback);
    run.input_size = subset.len();

    if subset.len() < run.minimum_sample_count {
        let failure = RunFailure::InsufficientData {
            required: run.minimum_sample_count,
            found: subset.len(),
        };
        warn!("{}", failure);
        run.failure = Some(failure);
        run.state = RunState::Failed;
        return (run, None);
    }

    run.result = None;
    run.failure = None;
    run.state = RunState::Running;
    debug!(
        "Run state: validating -> running ({} items, course {})",
        subset.len(),
        run.selected_course
    );

    let request = TopicRequest {
        feedback: subset,
        min_feedback_count: run.minimum_sample_count,
    };
    (run, Some(request))
}
