//! Analysis pipeline orchestrator
//!
//! # Phase progression
//! FETCHING → NORMALIZING → ENRICHING → PERSISTING → DONE
//!
//! One run is strictly sequential. Progress goes to a [`ProgressListener`];
//! the pipeline itself never formats user-facing text beyond short detail
//! messages. A run that finds nothing skips enrichment and persistence and
//! returns [`PipelineOutcome::NothingFound`].

use crate::models::{AnalysisRequest, ArtistTable};
use crate::report::ReportBuilder;
use crate::services::country_reference::CountryReference;
use crate::services::export::{export_table, ExportError};
use crate::services::musicbrainz_client::{FetchReport, MusicBrainzClient, PageOutcome, StopReason};
use crate::services::popularity_enricher::{EnrichProgress, EnrichStats, PopularityEnricher};
use crate::services::record_normalizer::{normalize, NormalizeOutcome, NormalizeStats};
use crate::services::spotify_client::SpotifyError;
use arta_common::events::{ArtaEvent, NothingFoundReason, PipelinePhase, ProgressListener};
use arta_common::time::SharedClock;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors that abort a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Country reference unavailable: {0}")]
    CountryReference(#[from] arta_common::Error),

    #[error(transparent)]
    Spotify(#[from] SpotifyError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}

/// Per-run counters
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub pages_fetched: usize,
    pub malformed_pages: usize,
    pub stopped_early: Option<StopReason>,
    pub normalize: NormalizeStats,
    pub enrich: EnrichStats,
}

/// Completed analysis
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub request: AnalysisRequest,
    pub table: ArtistTable,
    pub countries: CountryReference,
    pub export_path: PathBuf,
    pub stats: RunStats,
}

impl AnalysisResult {
    /// Report over this result's table
    pub fn report(&self) -> ReportBuilder<'_> {
        ReportBuilder::new(&self.table, &self.countries, &self.request.genre)
    }
}

/// How a run ended, short of an error
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    NothingFound { reason: NothingFoundReason },
    Completed(Box<AnalysisResult>),
}

/// Something that can carry out an analysis request
///
/// The conversation engine depends on this rather than on the concrete
/// pipeline.
#[async_trait]
pub trait AnalysisRunner: Send + Sync {
    async fn run_analysis(
        &self,
        run_id: Uuid,
        request: AnalysisRequest,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<PipelineOutcome, PipelineError>;
}

/// Fetch → normalize → enrich → persist
pub struct AnalysisPipeline {
    musicbrainz: MusicBrainzClient,
    enricher: PopularityEnricher,
    export_dir: PathBuf,
    clock: SharedClock,
}

/// Emits events stamped with one run id and the clock's time
struct RunReporter<'a> {
    run_id: Uuid,
    listener: &'a dyn ProgressListener,
    clock: &'a SharedClock,
}

impl RunReporter<'_> {
    fn phase(&self, phase: PipelinePhase) {
        tracing::info!(run_id = %self.run_id, phase = %phase, "Pipeline phase");
        self.listener.on_event(&ArtaEvent::PhaseChanged {
            run_id: self.run_id,
            phase,
            timestamp: self.clock.now(),
        });
    }

    fn detail(&self, phase: PipelinePhase, message: impl Into<String>) {
        self.listener.on_event(&ArtaEvent::ProgressDetail {
            run_id: self.run_id,
            phase,
            message: message.into(),
            timestamp: self.clock.now(),
        });
    }

    fn emit(&self, event: ArtaEvent) {
        self.listener.on_event(&event);
    }
}

fn page_message(outcome: &PageOutcome) -> String {
    match outcome {
        PageOutcome::Fetched { offset, records } => {
            format!("Fetched {} artists from offset {}", records, offset)
        }
        PageOutcome::Malformed { offset } => {
            format!("Response at offset {} is not valid JSON", offset)
        }
        PageOutcome::Stopped { offset, reason } => match reason {
            StopReason::Status(status) => {
                format!("No content or bad response at offset {}: {}", offset, status)
            }
            StopReason::EmptyBody => format!("No content at offset {}", offset),
            StopReason::Transport(e) => format!("Request at offset {} failed: {}", offset, e),
        },
    }
}

impl AnalysisPipeline {
    pub fn new(
        musicbrainz: MusicBrainzClient,
        enricher: PopularityEnricher,
        export_dir: PathBuf,
        clock: SharedClock,
    ) -> Self {
        Self {
            musicbrainz,
            enricher,
            export_dir,
            clock,
        }
    }

    /// Run the full pipeline for `request`
    ///
    /// Emits `AnalysisStarted`, the phase changes, and exactly one of
    /// `AnalysisCompleted`, `AnalysisNothingFound` or `AnalysisFailed`.
    pub async fn run(
        &self,
        run_id: Uuid,
        request: &AnalysisRequest,
        listener: &dyn ProgressListener,
    ) -> Result<PipelineOutcome, PipelineError> {
        let reporter = RunReporter {
            run_id,
            listener,
            clock: &self.clock,
        };
        reporter.emit(ArtaEvent::AnalysisStarted {
            run_id,
            genre: request.genre.clone(),
            requested_count: request.count,
            timestamp: self.clock.now(),
        });

        let result = self.execute(&reporter, request).await;

        match &result {
            Ok(PipelineOutcome::Completed(analysis)) => reporter.emit(ArtaEvent::AnalysisCompleted {
                run_id,
                artist_count: analysis.table.len(),
                enriched_count: analysis.table.enriched_count(),
                export_path: analysis.export_path.display().to_string(),
                timestamp: self.clock.now(),
            }),
            Ok(PipelineOutcome::NothingFound { reason }) => {
                reporter.emit(ArtaEvent::AnalysisNothingFound {
                    run_id,
                    reason: *reason,
                    timestamp: self.clock.now(),
                })
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Pipeline run failed");
                reporter.emit(ArtaEvent::AnalysisFailed {
                    run_id,
                    error: e.to_string(),
                    timestamp: self.clock.now(),
                });
            }
        }

        result
    }

    async fn execute(
        &self,
        reporter: &RunReporter<'_>,
        request: &AnalysisRequest,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut stats = RunStats::default();

        // FETCHING
        reporter.phase(PipelinePhase::Fetching);
        reporter.detail(
            PipelinePhase::Fetching,
            format!("Fetching artists with tag: {}", request.genre),
        );
        let FetchReport {
            records,
            pages_fetched,
            malformed_pages,
            stopped_early,
        } = self
            .musicbrainz
            .search_artists_by_tag(&request.genre, request.count, |outcome| {
                reporter.detail(PipelinePhase::Fetching, page_message(outcome))
            })
            .await;
        stats.pages_fetched = pages_fetched;
        stats.malformed_pages = malformed_pages;
        stats.stopped_early = stopped_early;
        reporter.detail(
            PipelinePhase::Fetching,
            format!("Total artists fetched: {}", records.len()),
        );

        // NORMALIZING
        reporter.phase(PipelinePhase::Normalizing);
        let countries = CountryReference::load_embedded()?;
        let (table, normalize_stats) = match normalize(&records, &countries) {
            NormalizeOutcome::NoData => {
                reporter.detail(PipelinePhase::Normalizing, "No artists found for this tag query");
                reporter.phase(PipelinePhase::Done);
                return Ok(PipelineOutcome::NothingFound {
                    reason: NothingFoundReason::NoRecords,
                });
            }
            NormalizeOutcome::Table { table, stats } => (table, stats),
        };
        stats.normalize = normalize_stats;
        reporter.detail(
            PipelinePhase::Normalizing,
            format!("Processed data: {} artists after cleaning", table.len()),
        );
        if table.is_empty() {
            reporter.phase(PipelinePhase::Done);
            return Ok(PipelineOutcome::NothingFound {
                reason: NothingFoundReason::AllFiltered,
            });
        }

        // ENRICHING
        reporter.phase(PipelinePhase::Enriching);
        let mut table = table;
        stats.enrich = self
            .enricher
            .enrich(&mut table, |progress| match progress {
                EnrichProgress::Matched { matched, .. } => reporter.detail(
                    PipelinePhase::Enriching,
                    format!("Found streaming data for {} artists", matched),
                ),
                EnrichProgress::Finished { matched, total } => reporter.detail(
                    PipelinePhase::Enriching,
                    format!(
                        "Streaming enrichment complete: {} of {} artists matched",
                        matched, total
                    ),
                ),
            })
            .await?;

        // PERSISTING
        reporter.phase(PipelinePhase::Persisting);
        let export_path = export_table(
            &self.export_dir,
            &request.genre,
            request.count,
            &table,
            self.clock.now(),
        )?;
        reporter.detail(
            PipelinePhase::Persisting,
            format!("Saved {} artists to {}", table.len(), export_path.display()),
        );

        reporter.phase(PipelinePhase::Done);

        Ok(PipelineOutcome::Completed(Box::new(AnalysisResult {
            run_id: reporter.run_id,
            request: request.clone(),
            table,
            countries,
            export_path,
            stats,
        })))
    }
}

#[async_trait]
impl AnalysisRunner for AnalysisPipeline {
    async fn run_analysis(
        &self,
        run_id: Uuid,
        request: AnalysisRequest,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.run(run_id, &request, listener.as_ref()).await
    }
}
