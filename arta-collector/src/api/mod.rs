//! HTTP API handlers for arta-collector
//!
//! The conversation front-end over HTTP, plus SSE and health.

pub mod health;
pub mod sessions;
pub mod sse;

pub use health::health_routes;
pub use sessions::session_routes;
pub use sse::event_stream;
