//! API handlers for the review server.

pub mod error;
pub mod review;

pub use error::ApiError;
