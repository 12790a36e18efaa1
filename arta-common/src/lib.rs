//! # ARTA Common Library
//!
//! Shared code for the ARTA artist analytics crates:
//! - Error types
//! - Configuration loading and path resolution
//! - Pipeline events, progress listeners and the EventBus
//! - Clock abstraction for testable time
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
