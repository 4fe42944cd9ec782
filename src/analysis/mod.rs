//! Analytics aggregation and course filtering.

pub mod aggregator;
pub mod filter;

pub use aggregator::*;
pub use filter::{course_counts, CourseFilter};
