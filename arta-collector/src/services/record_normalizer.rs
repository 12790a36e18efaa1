//! Raw catalog records → normalized artist table
//!
//! Steps, in order:
//! 1. Validate each raw object into a [`RawArtistRecord`] (invalid ones are logged and skipped)
//! 2. Drop repeated catalog ids, keeping the first occurrence
//! 3. Stable sort by relevance score, highest first
//! 4. Derive formation/dissolution years, lifespan and the ended flag
//! 5. Drop names containing non-ASCII characters
//! 6. Drop rows whose country is not in the reference; survivors take the
//!    reference spelling

use crate::models::{ArtistRecord, ArtistTable};
use crate::services::country_reference::CountryReference;
use crate::services::musicbrainz_client::RawArtistRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Counters describing one normalization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub raw: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub non_ascii_dropped: usize,
    pub unknown_country_dropped: usize,
    pub kept: usize,
}

/// Normalizer result
///
/// `NoData` means the catalog returned nothing at all; a `Table` may still
/// be empty when every record was filtered out.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    NoData,
    Table {
        table: ArtistTable,
        stats: NormalizeStats,
    },
}

/// Year from the first four characters of a date string
///
/// Returns `None` unless those are exactly four ASCII digits.
pub fn extract_year(date: Option<&str>) -> Option<i32> {
    let prefix = date?.as_bytes().get(..4)?;
    if !prefix.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(prefix).ok()?.parse().ok()
}

/// Flatten a validated record into an unenriched row
fn to_artist_record(raw: RawArtistRecord) -> (ArtistRecord, Option<String>) {
    let year_formed = extract_year(raw.begin.as_deref());
    let year_disbanded = extract_year(raw.end.as_deref());
    let lifespan = match (year_formed, year_disbanded) {
        (Some(formed), Some(disbanded)) => Some(disbanded - formed),
        _ => None,
    };

    let record = ArtistRecord {
        id: raw.id,
        name: raw.name,
        country_name: String::new(),
        year_formed,
        year_disbanded,
        lifespan,
        ended: year_disbanded.is_some(),
        spotify_followers: None,
        spotify_popularity: None,
        spotify_url: None,
        spotify_image: None,
    };
    (record, raw.area_name)
}

/// Normalize raw catalog objects against the country reference
pub fn normalize(raw_records: &[Value], countries: &CountryReference) -> NormalizeOutcome {
    if raw_records.is_empty() {
        return NormalizeOutcome::NoData;
    }

    let mut stats = NormalizeStats {
        raw: raw_records.len(),
        ..Default::default()
    };

    let mut seen_ids = HashSet::new();
    let mut validated = Vec::with_capacity(raw_records.len());
    for value in raw_records {
        match RawArtistRecord::from_value(value) {
            Ok(record) => {
                if seen_ids.insert(record.id.clone()) {
                    validated.push(record);
                } else {
                    stats.duplicates += 1;
                }
            }
            Err(e) => {
                stats.invalid += 1;
                tracing::warn!(id = ?e.id, missing = ?e.missing, "Skipping invalid artist record");
            }
        }
    }

    // sort_by is stable: equal scores keep catalog order
    validated.sort_by(|a, b| b.score.cmp(&a.score));

    let mut rows = Vec::with_capacity(validated.len());
    for raw in validated {
        let (mut record, area_name) = to_artist_record(raw);

        if !record.name.is_ascii() {
            stats.non_ascii_dropped += 1;
            continue;
        }

        let Some(canonical) = area_name
            .as_deref()
            .and_then(|area| countries.canonical_name(area))
        else {
            stats.unknown_country_dropped += 1;
            continue;
        };
        record.country_name = canonical.to_string();
        rows.push(record);
    }

    stats.kept = rows.len();
    tracing::info!(
        raw = stats.raw,
        kept = stats.kept,
        invalid = stats.invalid,
        duplicates = stats.duplicates,
        non_ascii = stats.non_ascii_dropped,
        unknown_country = stats.unknown_country_dropped,
        "Normalized artist records"
    );

    NormalizeOutcome::Table {
        table: ArtistTable::new(rows),
        stats,
    }
}
