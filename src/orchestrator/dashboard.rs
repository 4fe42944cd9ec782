//! Dashboard fetch and course-selection state.
//!
//! The loaded payload and the selected course are the only stored state;
//! the per-course view is derived on demand and never cached.

use crate::analysis::{default_course, derive_course_view};
use crate::client::ApiError;
use crate::models::{AnalyticsPayload, CourseAnalyticsView, CourseKey};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The session is not authenticated; send the user to login.
    RedirectToLogin,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub data: Option<AnalyticsPayload>,
    pub selected_course: Option<CourseKey>,
    pub status: LoadStatus,
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    FetchStarted,
    Loaded(AnalyticsPayload),
    Unauthorized,
    Failed(String),
    CourseSelected(CourseKey),
}

impl From<Result<AnalyticsPayload, ApiError>> for DashboardEvent {
    fn from(outcome: Result<AnalyticsPayload, ApiError>) -> Self {
        match outcome {
            Ok(payload) => DashboardEvent::Loaded(payload),
            Err(ApiError::Unauthorized) => DashboardEvent::Unauthorized,
            Err(e) => DashboardEvent::Failed(e.to_string()),
        }
    }
}

impl DashboardState {
    /// Analytics for the selected course, if data is loaded.
    pub fn current_view(&self) -> Option<CourseAnalyticsView> {
        let data = self.data.as_ref()?;
        let course = self.selected_course.as_deref()?;
        Some(derive_course_view(data, course))
    }
}

pub fn reduce(mut state: DashboardState, event: DashboardEvent) -> DashboardState {
    match event {
        DashboardEvent::FetchStarted => {
            state.status = LoadStatus::Loading;
        }
        DashboardEvent::Loaded(payload) => {
            state.selected_course = default_course(&payload);
            debug!(
                "Dashboard loaded; selected course {:?}",
                state.selected_course
            );
            state.data = Some(payload);
            state.status = LoadStatus::Loaded;
        }
        DashboardEvent::Unauthorized => {
            warn!("Analytics request was not authenticated");
            state.status = LoadStatus::RedirectToLogin;
        }
        DashboardEvent::Failed(message) => {
            warn!("Analytics request failed: {}", message);
            state.status = LoadStatus::Failed(message);
        }
        DashboardEvent::CourseSelected(course) => {
            state.selected_course = Some(course);
        }
    }
    state
}
