//! Analysis orchestration.
//!
//! This module provides the topic-analysis run state machine, the driver
//! that submits runs to the backend, result shaping for display, and the
//! dashboard load/selection state.

pub mod dashboard;
pub mod runner;
pub mod shaping;
pub mod state;

pub use dashboard::{DashboardEvent, DashboardState, LoadStatus};
pub use runner::{Orchestrator, TopicAnalyzer};
pub use shaping::{shape_results, CourseTopicsSection, SectionBody};
pub use state::{AnalysisRun, RunState};
