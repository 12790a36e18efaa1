//! Shared fixtures for front-end and HTTP tests
#![allow(dead_code)]

use arta_collector::frontend::{Conversation, Outbox, SessionStore};
use arta_collector::models::{AnalysisRequest, ArtistRecord, ArtistTable, SessionState};
use arta_collector::services::pipeline::{
    AnalysisResult, AnalysisRunner, PipelineError, PipelineOutcome, RunStats,
};
use arta_collector::services::CountryReference;
use arta_common::events::{ArtaEvent, EventBus, NothingFoundReason, PipelinePhase, ProgressListener};
use arta_common::time::{ManualClock, SharedClock};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

/// What the fake runner does when asked to analyse
#[derive(Clone)]
pub enum Script {
    Complete,
    NothingFound,
    Fail,
    /// Wait for the gate, then complete
    Gated(Arc<Notify>),
}

/// Analysis runner returning canned outcomes
pub struct FakeRunner {
    script: Script,
    pub calls: AtomicUsize,
}

impl FakeRunner {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
        })
    }
}

fn row(name: &str, country: &str, formed: i32, followers: u64, image: Option<&str>) -> ArtistRecord {
    ArtistRecord {
        id: format!("id-{}", name.to_lowercase()),
        name: name.to_string(),
        country_name: country.to_string(),
        year_formed: Some(formed),
        year_disbanded: None,
        lifespan: None,
        ended: false,
        spotify_followers: Some(followers),
        spotify_popularity: Some(50),
        spotify_url: Some(format!("https://open.spotify.com/artist/{}", name)),
        spotify_image: image.map(str::to_string),
    }
}

/// Small enriched table spanning three countries
pub fn sample_table() -> ArtistTable {
    ArtistTable::new(vec![
        row("Opeth", "Sweden", 1990, 1_500_000, Some("https://i.scdn.co/opeth")),
        row("Nightwish", "Finland", 1996, 2_800_000, None),
        row("Amorphis", "Finland", 1990, 300_000, None),
        row("Mastodon", "United States", 2000, 1_900_000, None),
    ])
}

pub fn sample_result(run_id: Uuid, request: AnalysisRequest) -> AnalysisResult {
    AnalysisResult {
        run_id,
        request,
        table: sample_table(),
        countries: CountryReference::load_embedded().unwrap(),
        export_path: PathBuf::from("/tmp/artists_metal_100_20240101_000000.csv"),
        stats: RunStats::default(),
    }
}

#[async_trait]
impl AnalysisRunner for FakeRunner {
    async fn run_analysis(
        &self,
        run_id: Uuid,
        request: AnalysisRequest,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        listener.on_event(&ArtaEvent::PhaseChanged {
            run_id,
            phase: PipelinePhase::Fetching,
            timestamp: Utc::now(),
        });
        listener.on_event(&ArtaEvent::ProgressDetail {
            run_id,
            phase: PipelinePhase::Fetching,
            message: "Fetched 100 artists".to_string(),
            timestamp: Utc::now(),
        });

        match &self.script {
            Script::Complete => Ok(PipelineOutcome::Completed(Box::new(sample_result(run_id, request)))),
            Script::NothingFound => Ok(PipelineOutcome::NothingFound {
                reason: NothingFoundReason::NoRecords,
            }),
            Script::Fail => {
                let error = PipelineError::Task("catalog exploded".to_string());
                listener.on_event(&ArtaEvent::AnalysisFailed {
                    run_id,
                    error: error.to_string(),
                    timestamp: Utc::now(),
                });
                Err(error)
            }
            Script::Gated(gate) => {
                gate.notified().await;
                Ok(PipelineOutcome::Completed(Box::new(sample_result(run_id, request))))
            }
        }
    }
}

/// Conversation wired to an outbox and a manual clock
pub struct Harness {
    pub conversation: Conversation,
    pub outbox: Arc<Outbox>,
    pub clock: ManualClock,
    pub events: EventBus,
}

pub fn harness(runner: Arc<FakeRunner>) -> Harness {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
    let shared: SharedClock = Arc::new(clock.clone());
    let outbox = Arc::new(Outbox::new());
    let events = EventBus::new(100);
    let conversation = Conversation::new(
        SessionStore::new(shared),
        runner,
        outbox.clone(),
        events.clone(),
    );
    Harness {
        conversation,
        outbox,
        clock,
        events,
    }
}

/// Poll until the user's session reaches `state` (or `None` when absent)
pub async fn wait_for_state(conversation: &Conversation, user_id: &str, state: Option<SessionState>) {
    for _ in 0..200 {
        let current = conversation.session_view(user_id).await.map(|v| v.state);
        if current == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session of {} never reached {:?}", user_id, state);
}
