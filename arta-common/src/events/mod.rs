//! Event types for the ARTA event system
//!
//! Provides the pipeline event enum, the [`ProgressListener`] observer seam
//! and the broadcast [`EventBus`].

mod pipeline_types;

pub use pipeline_types::{NothingFoundReason, PipelinePhase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

/// ARTA event types
///
/// Emitted by the analysis pipeline, consumed by the conversational
/// front-end and the SSE stream. Every event carries the `run_id` of the
/// pipeline run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArtaEvent {
    /// Pipeline run accepted and starting
    AnalysisStarted {
        run_id: Uuid,
        genre: String,
        requested_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// Pipeline moved to a new phase
    PhaseChanged {
        run_id: Uuid,
        phase: PipelinePhase,
        timestamp: DateTime<Utc>,
    },

    /// Free-form detail within the current phase (page counts, match counts)
    ProgressDetail {
        run_id: Uuid,
        phase: PipelinePhase,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Run finished with an enriched table
    AnalysisCompleted {
        run_id: Uuid,
        artist_count: usize,
        enriched_count: usize,
        export_path: String,
        timestamp: DateTime<Utc>,
    },

    /// Run finished without analysable artists
    AnalysisNothingFound {
        run_id: Uuid,
        reason: NothingFoundReason,
        timestamp: DateTime<Utc>,
    },

    /// Run aborted by an error
    AnalysisFailed {
        run_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ArtaEvent {
    /// Event type name (used as the SSE `event:` field)
    pub fn event_type(&self) -> &'static str {
        match self {
            ArtaEvent::AnalysisStarted { .. } => "AnalysisStarted",
            ArtaEvent::PhaseChanged { .. } => "PhaseChanged",
            ArtaEvent::ProgressDetail { .. } => "ProgressDetail",
            ArtaEvent::AnalysisCompleted { .. } => "AnalysisCompleted",
            ArtaEvent::AnalysisNothingFound { .. } => "AnalysisNothingFound",
            ArtaEvent::AnalysisFailed { .. } => "AnalysisFailed",
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            ArtaEvent::AnalysisStarted { run_id, .. }
            | ArtaEvent::PhaseChanged { run_id, .. }
            | ArtaEvent::ProgressDetail { run_id, .. }
            | ArtaEvent::AnalysisCompleted { run_id, .. }
            | ArtaEvent::AnalysisNothingFound { run_id, .. }
            | ArtaEvent::AnalysisFailed { run_id, .. } => *run_id,
        }
    }
}

/// Observer notified of pipeline progress
///
/// The pipeline never formats user-facing text; listeners map events to
/// whatever their transport needs.
pub trait ProgressListener: Send + Sync {
    fn on_event(&self, event: &ArtaEvent);
}

impl<F> ProgressListener for F
where
    F: Fn(&ArtaEvent) + Send + Sync,
{
    fn on_event(&self, event: &ArtaEvent) {
        self(event)
    }
}

/// Listener that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl ProgressListener for NullListener {
    fn on_event(&self, _event: &ArtaEvent) {}
}

/// Listener that keeps every event in memory, in arrival order
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<ArtaEvent>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<ArtaEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Phases in the order they were entered
    pub fn phases(&self) -> Vec<PipelinePhase> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                ArtaEvent::PhaseChanged { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect()
    }
}

impl ProgressListener for CollectingListener {
    fn on_event(&self, event: &ArtaEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses `tokio::sync::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block the pipeline)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use arta_common::events::{ArtaEvent, EventBus, PipelinePhase};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ArtaEvent::PhaseChanged {
///     run_id: uuid::Uuid::new_v4(),
///     phase: PipelinePhase::Fetching,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ArtaEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ArtaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ArtaEvent,
    ) -> Result<usize, broadcast::error::SendError<ArtaEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ArtaEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ProgressListener for EventBus {
    fn on_event(&self, event: &ArtaEvent) {
        self.emit_lossy(event.clone());
    }
}
