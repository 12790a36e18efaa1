//! Streaming popularity enrichment
//!
//! Looks up every row by artist name and copies the top match's metrics onto
//! the row. Lookups are best-effort: a failed or empty lookup leaves the
//! row's streaming fields null. Authentication failures abort the run.

use crate::models::ArtistTable;
use crate::services::spotify_client::{PopularitySource, SpotifyError};
use std::sync::Arc;
use std::time::Duration;

const CALL_DELAY_MS: u64 = 100;
/// Progress is reported each time this many more rows have matched
pub const PROGRESS_EVERY: usize = 10;

/// Enrichment progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichProgress {
    /// `matched` rows enriched so far out of `processed`
    Matched { matched: usize, processed: usize },
    Finished { matched: usize, total: usize },
}

/// Summary of one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub total: usize,
    pub matched: usize,
    pub not_found: usize,
    pub failed: usize,
}

pub struct PopularityEnricher {
    source: Arc<dyn PopularitySource>,
    call_delay: Duration,
}

impl PopularityEnricher {
    pub fn new(source: Arc<dyn PopularitySource>) -> Self {
        Self::with_delay(source, Duration::from_millis(CALL_DELAY_MS))
    }

    pub fn with_delay(source: Arc<dyn PopularitySource>, call_delay: Duration) -> Self {
        Self { source, call_delay }
    }

    /// Attach streaming metrics to every row of `table`
    pub async fn enrich<F>(&self, table: &mut ArtistTable, mut on_progress: F) -> Result<EnrichStats, SpotifyError>
    where
        F: FnMut(EnrichProgress),
    {
        let mut stats = EnrichStats {
            total: table.len(),
            ..Default::default()
        };

        for (index, row) in table.rows_mut().iter_mut().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.call_delay).await;
            }

            match self.source.lookup_artist(&row.name).await {
                Ok(Some(found)) => {
                    row.spotify_followers = Some(found.followers);
                    row.spotify_popularity = Some(found.popularity);
                    row.spotify_url = found.url;
                    row.spotify_image = found.image;
                    stats.matched += 1;

                    if stats.matched % PROGRESS_EVERY == 0 {
                        on_progress(EnrichProgress::Matched {
                            matched: stats.matched,
                            processed: index + 1,
                        });
                    }
                }
                Ok(None) => {
                    stats.not_found += 1;
                    tracing::debug!(artist = %row.name, "No streaming profile found");
                }
                Err(e) if e.is_auth() => {
                    tracing::error!(error = %e, "Streaming authentication failed, aborting enrichment");
                    return Err(e);
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(artist = %row.name, error = %e, "Streaming lookup failed");
                }
            }
        }

        on_progress(EnrichProgress::Finished {
            matched: stats.matched,
            total: stats.total,
        });
        tracing::info!(
            total = stats.total,
            matched = stats.matched,
            not_found = stats.not_found,
            failed = stats.failed,
            "Streaming enrichment complete"
        );

        Ok(stats)
    }
}
