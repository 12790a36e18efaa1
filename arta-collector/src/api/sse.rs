//! Server-Sent Events for pipeline progress

use crate::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use uuid::Uuid;

/// Optional filter for GET /events
#[derive(Debug, Default, Deserialize)]
pub struct EventStreamQuery {
    /// Only stream events of this pipeline run
    pub run_id: Option<Uuid>,
}

/// GET /events - SSE stream of pipeline events
///
/// Streams:
/// - AnalysisStarted
/// - PhaseChanged / ProgressDetail
/// - AnalysisCompleted / AnalysisNothingFound / AnalysisFailed
pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let run_filter = query.run_id;
    arta_common::sse::event_sse_stream(&state.event_bus, move |event| {
        run_filter.map_or(true, |run_id| event.run_id() == run_id)
    })
}
