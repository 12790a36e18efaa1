//! Normalized artist rows

use serde::{Deserialize, Serialize};

/// One matched artist after normalization (and optionally enrichment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRecord {
    /// Catalog identifier (unique within a table)
    pub id: String,
    pub name: String,
    /// Canonical country name from the country reference
    pub country_name: String,
    pub year_formed: Option<i32>,
    pub year_disbanded: Option<i32>,
    /// `year_disbanded - year_formed` when both are known
    pub lifespan: Option<i32>,
    /// True iff `year_disbanded` is known
    pub ended: bool,
    pub spotify_followers: Option<u64>,
    /// Streaming popularity score (0-100)
    pub spotify_popularity: Option<u32>,
    pub spotify_url: Option<String>,
    pub spotify_image: Option<String>,
}

impl ArtistRecord {
    /// Whether enrichment attached streaming metrics to this row
    pub fn is_enriched(&self) -> bool {
        self.spotify_followers.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.ended
    }
}

/// Ordered artist table
///
/// Row order is the catalog relevance order established by the normalizer;
/// report tie-breaks rely on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistTable {
    rows: Vec<ArtistRecord>,
}

impl ArtistTable {
    pub fn new(rows: Vec<ArtistRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ArtistRecord] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [ArtistRecord] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArtistRecord> {
        self.rows.iter()
    }

    /// Rows that received streaming metrics
    pub fn enriched_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_enriched()).count()
    }

    pub fn into_rows(self) -> Vec<ArtistRecord> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a ArtistTable {
    type Item = &'a ArtistRecord;
    type IntoIter = std::slice::Iter<'a, ArtistRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
