//! MusicBrainz API client
//!
//! Pages through the artist search endpoint for a genre tag. Paging is
//! best-effort: the first non-success status, empty body or transport error
//! ends the fetch and keeps whatever was already collected. A page whose
//! body is not JSON counts as empty and paging continues.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!(
    "arta-collector/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/arta/arta)"
);
/// Records requested per page
pub const PAGE_SIZE: u32 = 100;
/// Offset of the first requested page
pub const FIRST_OFFSET: u32 = 2;
const PAGE_DELAY_MS: u64 = 1000;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// MusicBrainz client errors
#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}")]
    ApiError(u16),

    #[error("Empty response body")]
    EmptyBody,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Why paging ended before the last planned offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Service answered with a non-success status
    Status(u16),
    /// Service answered 2xx with no body
    EmptyBody,
    /// Request never completed (timeout, connection failure)
    Transport(String),
}

/// Outcome of one page request, reported to the caller as it happens
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Fetched { offset: u32, records: usize },
    Malformed { offset: u32 },
    Stopped { offset: u32, reason: StopReason },
}

/// Result of a complete tag search
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Raw artist objects in service ranking order
    pub records: Vec<Value>,
    pub pages_fetched: usize,
    pub malformed_pages: usize,
    pub stopped_early: Option<StopReason>,
}

/// Offsets requested for a target count: 2, 102, 202, ... while `< count + 2`
pub fn page_offsets(count: u32) -> Vec<u32> {
    (FIRST_OFFSET..count.saturating_add(FIRST_OFFSET))
        .step_by(PAGE_SIZE as usize)
        .collect()
}

/// Typed view of one artist search hit
///
/// Only `id` and `name` are required; everything else is optional in the
/// catalog's responses.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArtistRecord {
    pub id: String,
    pub name: String,
    /// Relevance score (0-100)
    pub score: i64,
    pub area_name: Option<String>,
    pub begin: Option<String>,
    pub end: Option<String>,
    /// Source-side dissolved flag; informational only
    pub ended: Option<bool>,
}

/// A raw record that lacks required fields
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("artist record missing required fields: {}", missing.join(", "))]
pub struct RecordValidationError {
    /// Catalog id when present, for logging
    pub id: Option<String>,
    pub missing: Vec<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
struct WireArtist {
    id: Option<String>,
    name: Option<String>,
    score: Option<Value>,
    area: Option<WireArea>,
    #[serde(rename = "life-span")]
    life_span: Option<WireLifeSpan>,
}

#[derive(Debug, Default, Deserialize)]
struct WireArea {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireLifeSpan {
    begin: Option<String>,
    end: Option<String>,
    ended: Option<bool>,
}

impl RawArtistRecord {
    /// Validate one raw JSON object
    pub fn from_value(value: &Value) -> Result<Self, RecordValidationError> {
        // Wrong-typed optional fields are treated as absent, not as errors
        let wire: WireArtist = serde_json::from_value(value.clone()).unwrap_or_else(|_| WireArtist {
            id: value.get("id").and_then(Value::as_str).map(str::to_string),
            name: value.get("name").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        });

        let id = wire.id.filter(|s| !s.is_empty());
        let name = wire.name.filter(|s| !s.is_empty());

        let mut missing = Vec::new();
        if id.is_none() {
            missing.push("id");
        }
        if name.is_none() {
            missing.push("name");
        }
        let (Some(id), Some(name)) = (id.clone(), name) else {
            return Err(RecordValidationError { id, missing });
        };

        let score = match wire.score {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        };
        let life_span = wire.life_span.unwrap_or_default();

        Ok(Self {
            id,
            name,
            score,
            area_name: wire.area.and_then(|a| a.name),
            begin: life_span.begin,
            end: life_span.end,
            ended: life_span.ended,
        })
    }
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    base_url: String,
    page_delay: Duration,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self, MusicBrainzError> {
        Self::with_base_url(MUSICBRAINZ_BASE_URL, Duration::from_millis(PAGE_DELAY_MS))
    }

    /// Client against an alternative endpoint (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>, page_delay: Duration) -> Result<Self, MusicBrainzError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MusicBrainzError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_delay,
        })
    }

    /// Collect raw artist records tagged `tag`, paging up to `count`
    ///
    /// `on_page` is called after every page request.
    pub async fn search_artists_by_tag<F>(&self, tag: &str, count: u32, mut on_page: F) -> FetchReport
    where
        F: FnMut(&PageOutcome),
    {
        let offsets = page_offsets(count);
        let mut report = FetchReport::default();

        tracing::info!(tag = %tag, count, pages = offsets.len(), "Fetching artists from MusicBrainz");

        for (index, offset) in offsets.iter().copied().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.page_delay).await;
            }

            let outcome = match self.fetch_page(tag, offset).await {
                Ok(batch) => {
                    let records = batch.len();
                    report.records.extend(batch);
                    report.pages_fetched += 1;
                    tracing::debug!(offset, records, "Fetched MusicBrainz page");
                    PageOutcome::Fetched { offset, records }
                }
                Err(MusicBrainzError::ParseError(e)) => {
                    report.malformed_pages += 1;
                    tracing::warn!(offset, error = %e, "MusicBrainz page is not valid JSON, treating as empty");
                    PageOutcome::Malformed { offset }
                }
                Err(e) => {
                    let reason = match e {
                        MusicBrainzError::ApiError(status) => StopReason::Status(status),
                        MusicBrainzError::EmptyBody => StopReason::EmptyBody,
                        other => StopReason::Transport(other.to_string()),
                    };
                    tracing::warn!(offset, reason = ?reason, "Stopping MusicBrainz paging early");
                    PageOutcome::Stopped { offset, reason }
                }
            };

            on_page(&outcome);

            if let PageOutcome::Stopped { reason, .. } = outcome {
                report.stopped_early = Some(reason);
                break;
            }
        }

        tracing::info!(
            tag = %tag,
            total = report.records.len(),
            pages = report.pages_fetched,
            "MusicBrainz fetch finished"
        );

        report
    }

    /// Fetch a single search page
    async fn fetch_page(&self, tag: &str, offset: u32) -> Result<Vec<Value>, MusicBrainzError> {
        let url = format!("{}/artist", self.base_url);
        let query = format!("tag:{}", tag);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("query", query.as_str()),
                ("limit", &PAGE_SIZE.to_string()),
                ("offset", &offset.to_string()),
                ("fmt", "json"),
            ])
            .send()
            .await
            .map_err(|e| MusicBrainzError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MusicBrainzError::ApiError(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MusicBrainzError::NetworkError(e.to_string()))?;
        if body.is_empty() {
            return Err(MusicBrainzError::EmptyBody);
        }

        let page: Value =
            serde_json::from_slice(&body).map_err(|e| MusicBrainzError::ParseError(e.to_string()))?;

        Ok(page
            .get("artists")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = MusicBrainzClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_page_offsets() {
        assert_eq!(page_offsets(10), vec![2]);
        assert_eq!(page_offsets(100), vec![2]);
        assert_eq!(page_offsets(101), vec![2, 102]);
        assert_eq!(page_offsets(250), vec![2, 102, 202]);
        assert!(page_offsets(0).is_empty());
    }

    #[test]
    fn test_raw_record_full() {
        let value = json!({
            "id": "abc",
            "name": "Metallica",
            "score": 100,
            "area": {"name": "United States"},
            "life-span": {"begin": "1981-10-28", "ended": null}
        });
        let record = RawArtistRecord::from_value(&value).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.score, 100);
        assert_eq!(record.area_name.as_deref(), Some("United States"));
        assert_eq!(record.begin.as_deref(), Some("1981-10-28"));
        assert!(record.end.is_none());
        assert!(record.ended.is_none());
    }

    #[test]
    fn test_raw_record_reports_missing_fields() {
        let err = RawArtistRecord::from_value(&json!({"score": 50})).unwrap_err();
        assert_eq!(err.missing, vec!["id", "name"]);
        assert!(err.id.is_none());

        let err = RawArtistRecord::from_value(&json!({"id": "x1"})).unwrap_err();
        assert_eq!(err.missing, vec!["name"]);
        assert_eq!(err.id.as_deref(), Some("x1"));
    }

    #[test]
    fn test_raw_record_tolerates_odd_optional_fields() {
        let value = json!({"id": "x", "name": "Y", "score": "87", "area": 5});
        let record = RawArtistRecord::from_value(&value).unwrap();
        assert_eq!(record.name, "Y");
        assert!(record.area_name.is_none());
    }
}
