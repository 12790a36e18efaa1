//! CSV export of the enriched artist table

use crate::models::{ArtistRecord, ArtistTable};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

/// One CSV line; field order is the column order
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    country_name: &'a str,
    year_formed: Option<i32>,
    year_disbanded: Option<i32>,
    ended: bool,
    lifespan: Option<i32>,
    spotify_followers: Option<u64>,
    spotify_popularity: Option<u32>,
    spotify_url: Option<&'a str>,
    spotify_image: Option<&'a str>,
}

impl<'a> From<&'a ArtistRecord> for CsvRow<'a> {
    fn from(record: &'a ArtistRecord) -> Self {
        Self {
            id: &record.id,
            name: &record.name,
            country_name: &record.country_name,
            year_formed: record.year_formed,
            year_disbanded: record.year_disbanded,
            ended: record.ended,
            lifespan: record.lifespan,
            spotify_followers: record.spotify_followers,
            spotify_popularity: record.spotify_popularity,
            spotify_url: record.spotify_url.as_deref(),
            spotify_image: record.spotify_image.as_deref(),
        }
    }
}

/// Tag as a single filename component: whitespace, path separators and
/// other characters unsafe in filenames become `_`
fn file_name_tag(tag: &str) -> String {
    tag.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// `artists_<tag>_<count>_<YYYYMMDD_HHMMSS>.csv`
pub fn export_file_name(tag: &str, count: u32, timestamp: DateTime<Utc>) -> String {
    format!(
        "artists_{}_{}_{}.csv",
        file_name_tag(tag),
        count,
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Write `table` to a new CSV file in `dir`, creating `dir` if needed
pub fn export_table(
    dir: &Path,
    tag: &str,
    count: u32,
    table: &ArtistTable,
    timestamp: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(tag, count, timestamp));

    let mut writer = csv::Writer::from_path(&path)?;
    for record in table {
        writer.serialize(CsvRow::from(record))?;
    }
    if table.is_empty() {
        // serialize() writes the header with the first row only
        writer.write_record([
            "id",
            "name",
            "country_name",
            "year_formed",
            "year_disbanded",
            "ended",
            "lifespan",
            "spotify_followers",
            "spotify_popularity",
            "spotify_url",
            "spotify_image",
        ])?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = table.len(), "Exported artist table");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artist::test_support::{artist, enriched};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(
            export_file_name("death metal", 200, timestamp()),
            "artists_death_metal_200_20240309_140507.csv"
        );
    }

    #[test]
    fn test_file_name_neutralises_path_characters() {
        assert_eq!(
            export_file_name("rock/pop", 100, timestamp()),
            "artists_rock_pop_100_20240309_140507.csv"
        );
        assert_eq!(
            export_file_name("a\\b: c", 10, timestamp()),
            "artists_a_b__c_10_20240309_140507.csv"
        );
        assert_eq!(
            export_file_name("../etc", 10, timestamp()),
            "artists_.._etc_10_20240309_140507.csv"
        );
    }

    #[test]
    fn test_slash_in_tag_stays_in_export_dir() {
        let temp = TempDir::new().unwrap();
        let path = export_table(temp.path(), "rock/pop", 100, &ArtistTable::default(), timestamp()).unwrap();

        assert_eq!(path.parent(), Some(temp.path()));
        assert!(path.exists());
    }

    #[test]
    fn test_export_creates_directory_and_writes_rows() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("exports");
        let table = ArtistTable::new(vec![
            enriched("Ghost", "Sweden", Some(2006), 2_000_000, 70),
            artist("Bathory", "Sweden", Some(1983), Some(2004)),
        ]);

        let path = export_table(&dir, "metal", 100, &table, timestamp()).unwrap();
        assert!(path.starts_with(&dir));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "id,name,country_name,year_formed,year_disbanded,ended,lifespan,\
             spotify_followers,spotify_popularity,spotify_url,spotify_image"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("id-ghost,Ghost,Sweden,2006,,false,,2000000,70,"));
        assert_eq!(lines[2], "id-bathory,Bathory,Sweden,1983,2004,true,21,,,,");
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let temp = TempDir::new().unwrap();
        let path = export_table(temp.path(), "jazz", 10, &ArtistTable::default(), timestamp()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("id,name,"));
    }
}
