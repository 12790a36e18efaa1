//! arta-collector library interface
//!
//! Exposes the pipeline, report and conversation APIs for the binary and
//! for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod frontend;
pub mod models;
pub mod report;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use arta_common::events::{ArtaEvent, EventBus};
use chrono::{DateTime, Utc};
use frontend::{Conversation, Outbox, SessionStore};
use services::pipeline::AnalysisRunner;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Conversation engine; its notifier is `outbox`
    pub conversation: Conversation,
    /// Background replies waiting for the next request of each user
    pub outbox: Arc<Outbox>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline failure for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(runner: Arc<dyn AnalysisRunner>, store: SessionStore, event_bus: EventBus) -> Self {
        let outbox = Arc::new(Outbox::new());
        let conversation = Conversation::new(store, runner, outbox.clone(), event_bus.clone());
        Self {
            conversation,
            outbox,
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Override the suggested genre and default artist count
    pub fn with_defaults(mut self, default_genre: impl Into<String>, default_count: u32) -> Self {
        self.conversation = self.conversation.with_defaults(default_genre, default_count);
        self
    }

    /// Record pipeline failures in `last_error`; a later success clears it
    pub fn spawn_error_tracker(&self) -> JoinHandle<()> {
        let mut rx = self.event_bus.subscribe();
        let last_error = self.last_error.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ArtaEvent::AnalysisFailed { error, .. }) => {
                        *last_error.write().await = Some(error);
                    }
                    Ok(ArtaEvent::AnalysisCompleted { .. }) => {
                        *last_error.write().await = None;
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::session_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
