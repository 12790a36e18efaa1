//! Summary statistics over an artist table
//!
//! Everything here is a pure function of the table and the country
//! reference. Where ordering ties occur, earlier table rows win.

use crate::models::{ArtistRecord, ArtistTable};
use crate::services::country_reference::CountryReference;
use serde::Serialize;
use std::collections::HashMap;

/// Countries need at least this many artists for a per-million figure
pub const PER_MILLION_MIN_ARTISTS: usize = 3;
/// Formation years are grouped into this many bins for the peak period
pub const PEAK_PERIOD_BINS: usize = 5;
const TOP_COUNTRIES: usize = 3;
const TOP_PER_MILLION: usize = 3;
/// Length of the top-artists listing
pub const TOP_ARTISTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub artists: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerMillion {
    pub country: String,
    pub artists: usize,
    pub population: u64,
    pub per_million: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OldestActive {
    pub name: String,
    pub year_formed: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopArtist {
    pub name: String,
    pub url: Option<String>,
    pub image: Option<String>,
    pub followers: u64,
}

/// Statistics shown after a completed analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub genre: String,
    pub total_artists: usize,
    pub active_artists: usize,
    pub disbanded_artists: usize,
    pub active_percent: f64,
    pub disbanded_percent: f64,
    pub mean_lifespan: Option<f64>,
    pub distinct_countries: usize,
    pub top_countries: Vec<CountryCount>,
    pub top_per_million: Vec<PerMillion>,
    pub profiles_found: usize,
    pub profiles_percent: f64,
    pub mean_followers: Option<f64>,
    pub mean_popularity: Option<f64>,
    /// `start-end` of the busiest formation bin
    pub peak_period: Option<String>,
    pub oldest_active: Option<OldestActive>,
    pub top_artists: Vec<TopArtist>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Artists per country, most first; ties keep first appearance order
pub fn country_counts<'a, I>(rows: I) -> Vec<CountryCount>
where
    I: IntoIterator<Item = &'a ArtistRecord>,
{
    let mut order: Vec<CountryCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        match index.get(row.country_name.as_str()) {
            Some(&i) => order[i].artists += 1,
            None => {
                index.insert(row.country_name.as_str(), order.len());
                order.push(CountryCount {
                    country: row.country_name.clone(),
                    artists: 1,
                });
            }
        }
    }
    order.sort_by(|a, b| b.artists.cmp(&a.artists));
    order
}

/// Artists per million inhabitants, highest first
///
/// Only countries with at least [`PER_MILLION_MIN_ARTISTS`] artists and a
/// known, positive population are included.
pub fn artists_per_million(table: &ArtistTable, countries: &CountryReference) -> Vec<PerMillion> {
    let mut rates: Vec<PerMillion> = country_counts(table)
        .into_iter()
        .filter(|c| c.artists >= PER_MILLION_MIN_ARTISTS)
        .filter_map(|c| {
            let population = countries.lookup(&c.country)?.usable_population()?;
            Some(PerMillion {
                per_million: c.artists as f64 / population as f64 * 1_000_000.0,
                country: c.country,
                artists: c.artists,
                population,
            })
        })
        .collect();
    rates.sort_by(|a, b| b.per_million.total_cmp(&a.per_million));
    rates
}

/// Busiest formation period over five equal-width bins
///
/// Bins span `min..=max`; each is right-inclusive and the first also holds
/// `min`. Needs at least two years. Ties go to the earliest bin.
pub fn peak_formation_period(years: &[i32]) -> Option<String> {
    if years.len() < 2 {
        return None;
    }
    let min = *years.iter().min()?;
    let max = *years.iter().max()?;
    if min == max {
        return Some(format!("{}-{}", min, max));
    }

    let width = f64::from(max - min) / PEAK_PERIOD_BINS as f64;
    let mut counts = [0usize; PEAK_PERIOD_BINS];
    for &year in years {
        let position = (f64::from(year - min) / width).ceil() as i64 - 1;
        let bin = position.clamp(0, PEAK_PERIOD_BINS as i64 - 1) as usize;
        counts[bin] += 1;
    }

    let mut peak = 0;
    for (bin, &count) in counts.iter().enumerate() {
        if count > counts[peak] {
            peak = bin;
        }
    }

    let start = f64::from(min) + peak as f64 * width;
    let end = start + width;
    Some(format!("{:.0}-{:.0}", start, end))
}

/// Active artist with the earliest known formation year
pub fn oldest_active(table: &ArtistTable) -> Option<OldestActive> {
    let mut oldest: Option<(&ArtistRecord, i32)> = None;
    for row in table.iter().filter(|r| r.is_active()) {
        let Some(year) = row.year_formed else { continue };
        if oldest.map_or(true, |(_, best)| year < best) {
            oldest = Some((row, year));
        }
    }
    oldest.map(|(row, year)| OldestActive {
        name: row.name.clone(),
        year_formed: year,
    })
}

/// Up to [`TOP_ARTISTS`] rows by follower count; rows without followers are skipped
pub fn top_artists_by_followers(table: &ArtistTable) -> Vec<TopArtist> {
    let mut with_followers: Vec<(&ArtistRecord, u64)> = table
        .iter()
        .filter_map(|r| r.spotify_followers.map(|f| (r, f)))
        .collect();
    with_followers.sort_by(|a, b| b.1.cmp(&a.1));
    with_followers
        .into_iter()
        .take(TOP_ARTISTS)
        .map(|(row, followers)| TopArtist {
            name: row.name.clone(),
            url: row.spotify_url.clone(),
            image: row.spotify_image.clone(),
            followers,
        })
        .collect()
}

impl AnalysisSummary {
    pub fn compute(table: &ArtistTable, countries: &CountryReference, genre: &str) -> Self {
        let total = table.len();
        let active = table.iter().filter(|r| r.is_active()).count();
        let disbanded = total - active;

        let country_counts = country_counts(table);
        let profiles_found = table.enriched_count();
        let years: Vec<i32> = table.iter().filter_map(|r| r.year_formed).collect();

        let mut top_per_million = artists_per_million(table, countries);
        top_per_million.truncate(TOP_PER_MILLION);

        Self {
            genre: genre.to_string(),
            total_artists: total,
            active_artists: active,
            disbanded_artists: disbanded,
            active_percent: percent(active, total),
            disbanded_percent: percent(disbanded, total),
            mean_lifespan: mean(table.iter().filter_map(|r| r.lifespan).map(f64::from)),
            distinct_countries: country_counts.len(),
            top_countries: country_counts.into_iter().take(TOP_COUNTRIES).collect(),
            top_per_million,
            profiles_found,
            profiles_percent: percent(profiles_found, total),
            mean_followers: mean(table.iter().filter_map(|r| r.spotify_followers).map(|f| f as f64)),
            mean_popularity: mean(
                table
                    .iter()
                    .filter_map(|r| r.spotify_popularity)
                    .map(f64::from),
            ),
            peak_period: peak_formation_period(&years),
            oldest_active: oldest_active(table),
            top_artists: top_artists_by_followers(table),
        }
    }

    /// Plain-text rendering for chat transports
    pub fn render_text(&self) -> String {
        let mut text = format!("📊 {} ANALYSIS\n\n", self.genre.to_uppercase());

        text.push_str("• Artist Statistics:\n");
        text.push_str(&format!("  - Total artists analyzed: {}\n", self.total_artists));
        text.push_str(&format!(
            "  - Active artists: {} ({:.1}%)\n",
            self.active_artists, self.active_percent
        ));
        text.push_str(&format!(
            "  - Disbanded artists: {} ({:.1}%)\n",
            self.disbanded_artists, self.disbanded_percent
        ));
        if let Some(lifespan) = self.mean_lifespan {
            text.push_str(&format!("  - Average artist lifespan: {:.1} years\n", lifespan));
        }

        text.push_str("\n• Geographic Distribution:\n");
        text.push_str(&format!(
            "  - Artists found in {} countries\n",
            self.distinct_countries
        ));
        let top_countries: Vec<String> = self
            .top_countries
            .iter()
            .map(|c| format!("{} ({})", c.country, c.artists))
            .collect();
        text.push_str(&format!("  - Top countries: {}\n", top_countries.join(", ")));
        let per_million = if self.top_per_million.is_empty() {
            "No data available".to_string()
        } else {
            self.top_per_million
                .iter()
                .map(|c| format!("{} ({:.1})", c.country, c.per_million))
                .collect::<Vec<_>>()
                .join(", ")
        };
        text.push_str(&format!("  - Highest artists per million: {}\n", per_million));

        text.push_str("\n• Spotify Performance:\n");
        text.push_str(&format!(
            "  - Artists with Spotify profiles: {} ({:.1}%)\n",
            self.profiles_found, self.profiles_percent
        ));
        if let Some(followers) = self.mean_followers {
            text.push_str(&format!(
                "  - Average followers: {}\n",
                format_thousands(followers.round() as u64)
            ));
        }
        if let Some(popularity) = self.mean_popularity {
            text.push_str(&format!("  - Average popularity score: {:.1}/100\n", popularity));
        }

        text.push_str("\n• Timeline:\n");
        text.push_str(&format!(
            "  - Peak formation period: {}\n",
            self.peak_period.as_deref().unwrap_or("Insufficient data")
        ));
        let oldest = self
            .oldest_active
            .as_ref()
            .map(|o| format!("{} ({})", o.name, o.year_formed))
            .unwrap_or_else(|| "None found".to_string());
        text.push_str(&format!("  - Oldest active artist: {}", oldest));

        text
    }

    /// Numbered listing of the top artists with profile links
    pub fn render_top_artists(&self) -> String {
        let mut text = format!(
            "Top {} Artists with Spotify URLs and Images:",
            self.top_artists.len()
        );
        for (rank, artist) in self.top_artists.iter().enumerate() {
            text.push_str(&format!("\n\n{}. {}\n", rank + 1, artist.name));
            if let Some(url) = &artist.url {
                text.push_str(&format!("🎵 Listen: {}\n", url));
            }
            text.push_str(&format!("👥 Followers: {}", format_thousands(artist.followers)));
        }
        text
    }
}

/// `1234567` → `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::artist::test_support::{artist, enriched};

    fn reference() -> CountryReference {
        CountryReference::from_json(
            r#"[
                {"name": "Sweden", "population": 10000000, "region": "Europe"},
                {"name": "Finland", "population": 5000000, "region": "Europe"},
                {"name": "Norway", "population": "unknown", "region": "Europe"},
                {"name": "United States", "population": 330000000, "region": "Americas"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_peak_period_example() {
        assert_eq!(
            peak_formation_period(&[1990, 1991, 1995, 2000, 2010]).as_deref(),
            Some("1990-1994")
        );
    }

    #[test]
    fn test_peak_period_needs_two_years() {
        assert_eq!(peak_formation_period(&[]), None);
        assert_eq!(peak_formation_period(&[1990]), None);
        assert_eq!(peak_formation_period(&[1990, 1990]).as_deref(), Some("1990-1990"));
    }

    #[test]
    fn test_peak_period_ties_go_to_earliest_bin() {
        // width 2: [2000,2002] [2002,2004] ... two years each in bins 0 and 4
        assert_eq!(
            peak_formation_period(&[2000, 2001, 2009, 2010]).as_deref(),
            Some("2000-2002")
        );
    }

    #[test]
    fn test_empty_table_has_zero_percentages() {
        let summary = AnalysisSummary::compute(&ArtistTable::default(), &reference(), "metal");
        assert_eq!(summary.total_artists, 0);
        assert_eq!(summary.active_percent, 0.0);
        assert_eq!(summary.disbanded_percent, 0.0);
        assert_eq!(summary.profiles_percent, 0.0);
        assert!(summary.mean_lifespan.is_none());
        assert!(summary.peak_period.is_none());
        assert!(summary.oldest_active.is_none());
    }

    #[test]
    fn test_per_million_requires_three_artists_and_numeric_population() {
        let table = ArtistTable::new(vec![
            artist("A", "Sweden", None, None),
            artist("B", "Sweden", None, None),
            artist("C", "Sweden", None, None),
            artist("D", "Finland", None, None),
            artist("E", "Finland", None, None),
            artist("F", "Norway", None, None),
            artist("G", "Norway", None, None),
            artist("H", "Norway", None, None),
        ]);

        let rates = artists_per_million(&table, &reference());
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].country, "Sweden");
        assert!((rates[0].per_million - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_top_countries_ties_keep_first_appearance() {
        let table = ArtistTable::new(vec![
            artist("A", "Finland", None, None),
            artist("B", "Sweden", None, None),
            artist("C", "Sweden", None, None),
            artist("D", "Norway", None, None),
            artist("E", "Finland", None, None),
            artist("F", "United States", None, None),
        ]);
        let counts = country_counts(&table);
        let names: Vec<&str> = counts.iter().map(|c| c.country.as_str()).collect();
        assert_eq!(names, vec!["Finland", "Sweden", "Norway", "United States"]);
    }

    #[test]
    fn test_oldest_active_skips_ended_and_unknown_years() {
        let table = ArtistTable::new(vec![
            artist("Ended", "Sweden", Some(1970), Some(1980)),
            artist("Unknown", "Sweden", None, None),
            artist("First1985", "Sweden", Some(1985), None),
            artist("Second1985", "Sweden", Some(1985), None),
        ]);
        let oldest = oldest_active(&table).unwrap();
        assert_eq!(oldest.name, "First1985");
        assert_eq!(oldest.year_formed, 1985);
    }

    #[test]
    fn test_summary_statistics() {
        let table = ArtistTable::new(vec![
            enriched("Big", "Sweden", Some(1990), 3_000_000, 80),
            enriched("Small", "Sweden", Some(2000), 1_000_000, 40),
            artist("Gone", "Finland", Some(1980), Some(1990)),
            artist("Gone Too", "Finland", Some(1985), Some(2005)),
        ]);
        let summary = AnalysisSummary::compute(&table, &reference(), "doom");

        assert_eq!(summary.active_artists, 2);
        assert_eq!(summary.disbanded_artists, 2);
        assert_eq!(summary.active_percent, 50.0);
        assert_eq!(summary.mean_lifespan, Some(15.0));
        assert_eq!(summary.distinct_countries, 2);
        assert_eq!(summary.profiles_found, 2);
        assert_eq!(summary.mean_followers, Some(2_000_000.0));
        assert_eq!(summary.mean_popularity, Some(60.0));
        assert_eq!(summary.top_artists[0].name, "Big");
        assert_eq!(summary.top_artists.len(), 2);

        let text = summary.render_text();
        assert!(text.starts_with("📊 DOOM ANALYSIS"));
        assert!(text.contains("Average followers: 2,000,000"));
        assert!(text.contains("Highest artists per million: No data available"));
        assert!(text.contains("Oldest active artist: Big (1990)"));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }
}
