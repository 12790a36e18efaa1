//! Conversational analysis session
//!
//! A session progresses through a fixed linear sequence:
//! AWAITING_GENRE → AWAITING_COUNT → COLLECTING → SHOWING_RESULTS
//!
//! A run that finds nothing or fails parks the session in IDLE until the
//! user starts over.

use crate::services::pipeline::AnalysisResult;
use arta_common::events::PipelinePhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Conversation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Waiting for the genre tag
    AwaitingGenre,
    /// Waiting for the artist count
    AwaitingCount,
    /// Pipeline running in the background
    Collecting,
    /// Results available, chart menu offered
    ShowingResults,
    /// Last run found nothing or failed
    Idle,
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Per-user analysis session (in-memory only)
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub session_id: Uuid,
    pub user_id: String,
    pub state: SessionState,
    pub genre: Option<String>,
    pub count: Option<u32>,
    /// Pipeline run currently (or last) associated with this session
    pub run_id: Option<Uuid>,
    /// Last pipeline phase reported for the current run
    pub phase: Option<PipelinePhase>,
    /// User-facing progress message, rewritten on every pipeline event
    pub progress_text: Option<String>,
    /// Completed analysis, present in SHOWING_RESULTS
    pub results: Option<Arc<AnalysisResult>>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl AnalysisSession {
    /// New session waiting for a genre
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            state: SessionState::AwaitingGenre,
            genre: None,
            count: None,
            run_id: None,
            phase: None,
            progress_text: None,
            results: None,
            created_at: now,
            last_activity: now,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: SessionState, now: DateTime<Utc>) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: now,
        };
        self.state = new_state;

        match new_state {
            SessionState::AwaitingGenre | SessionState::Idle => {
                self.run_id = None;
                self.phase = None;
                self.progress_text = None;
                self.results = None;
            }
            SessionState::AwaitingCount | SessionState::Collecting | SessionState::ShowingResults => {}
        }

        transition
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Seconds since the last user interaction
    pub fn idle_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_activity).num_seconds()
    }

    pub fn is_collecting(&self) -> bool {
        self.state == SessionState::Collecting
    }
}

/// Serializable snapshot of a session for the HTTP adapter
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub user_id: String,
    pub state: SessionState,
    pub genre: Option<String>,
    pub count: Option<u32>,
    pub phase: Option<PipelinePhase>,
    pub progress_text: Option<String>,
    pub artist_count: Option<usize>,
    pub export_path: Option<String>,
    pub last_activity: DateTime<Utc>,
}

impl From<&AnalysisSession> for SessionView {
    fn from(session: &AnalysisSession) -> Self {
        Self {
            session_id: session.session_id,
            user_id: session.user_id.clone(),
            state: session.state,
            genre: session.genre.clone(),
            count: session.count,
            phase: session.phase,
            progress_text: session.progress_text.clone(),
            artist_count: session.results.as_ref().map(|r| r.table.len()),
            export_path: session
                .results
                .as_ref()
                .map(|r| r.export_path.display().to_string()),
            last_activity: session.last_activity,
        }
    }
}
