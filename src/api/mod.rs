//! API layer for the registry revealer
//!
//! REST endpoints for grant/dispute eligibility queries and the manual
//! reveal-job trigger.

pub mod error;
mod rest;

pub use error::{ApiError, ErrorCode};
pub use rest::*;
