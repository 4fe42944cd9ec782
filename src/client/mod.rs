//! Backend API access.

pub mod api;

pub use api::{ApiError, FeedupClient};
