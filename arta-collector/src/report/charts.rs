//! Chart renderings
//!
//! Every chart is an SVG document rendered into a fresh buffer per call.
//! Charts with nothing to plot render a placeholder message instead.

use crate::models::ArtistTable;
use crate::report::summary::{artists_per_million, country_counts};
use crate::report::svg::{blend, Anchor, SvgCanvas, SUNSET_PALETTE};
use crate::services::country_reference::CountryReference;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";
const TOP_N: usize = 10;
const HISTOGRAM_BINS: usize = 20;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 1000.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_TOP: f64 = 70.0;
const MARGIN_BOTTOM: f64 = 230.0;

/// The individual charts, in menu order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    TopPopularity,
    TopFollowers,
    YearDistribution,
    ActiveByCountry,
    ArtistsPerMillion,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::TopPopularity,
        ChartKind::TopFollowers,
        ChartKind::YearDistribution,
        ChartKind::ActiveByCountry,
        ChartKind::ArtistsPerMillion,
    ];

    /// Identifier used in URLs and menu callbacks
    pub fn slug(self) -> &'static str {
        match self {
            ChartKind::TopPopularity => "popularity",
            ChartKind::TopFollowers => "followers",
            ChartKind::YearDistribution => "years",
            ChartKind::ActiveByCountry => "map",
            ChartKind::ArtistsPerMillion => "per_million",
        }
    }

    /// Menu button text
    pub fn menu_label(self) -> &'static str {
        match self {
            ChartKind::TopPopularity => "1. Top by Popularity",
            ChartKind::TopFollowers => "2. Top by Followers",
            ChartKind::YearDistribution => "3. Formation Year Distribution",
            ChartKind::ActiveByCountry => "4. Active Artists Map",
            ChartKind::ArtistsPerMillion => "5. Artists per Million",
        }
    }

    /// Caption sent along with the image
    pub fn caption(self) -> &'static str {
        match self {
            ChartKind::TopPopularity => "Top 10 Artists by Spotify Popularity",
            ChartKind::TopFollowers => "Top 10 Artists by Spotify Followers",
            ChartKind::YearDistribution => "Distribution of Artist Formation Years",
            ChartKind::ActiveByCountry => "Active Artists by Country",
            ChartKind::ArtistsPerMillion => "Artists per Million People by Country",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A menu selection: one chart or all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartChoice {
    Single(ChartKind),
    All,
}

impl ChartChoice {
    pub const ALL_LABEL: &'static str = "6. All Plots";

    /// Charts this choice expands to, in menu order
    pub fn kinds(self) -> Vec<ChartKind> {
        match self {
            ChartChoice::Single(kind) => vec![kind],
            ChartChoice::All => ChartKind::ALL.to_vec(),
        }
    }

    /// Every menu entry as `(slug, label)`
    pub fn menu() -> Vec<(&'static str, &'static str)> {
        ChartKind::ALL
            .iter()
            .map(|k| (k.slug(), k.menu_label()))
            .chain(std::iter::once(("all", Self::ALL_LABEL)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chart: {0}")]
pub struct UnknownChart(pub String);

impl FromStr for ChartChoice {
    type Err = UnknownChart;

    /// Accepts slugs (`popularity`, `plot_popularity`), menu numbers (`1`..`6`) and `all`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let key = key.strip_prefix("plot_").unwrap_or(&key);
        if key == "all" || key == "6" {
            return Ok(ChartChoice::All);
        }
        if let Ok(number) = key.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|i| ChartKind::ALL.get(i))
                .map(|k| ChartChoice::Single(*k))
                .ok_or_else(|| UnknownChart(s.to_string()));
        }
        ChartKind::ALL
            .iter()
            .find(|k| k.slug() == key)
            .map(|k| ChartChoice::Single(*k))
            .ok_or_else(|| UnknownChart(s.to_string()))
    }
}

/// One rendered chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub caption: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl RenderedChart {
    fn svg(kind: ChartKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            caption: kind.caption().to_string(),
            content_type: SVG_CONTENT_TYPE,
            bytes,
        }
    }
}

/// Render one chart
pub fn render_chart(
    kind: ChartKind,
    table: &ArtistTable,
    countries: &CountryReference,
    genre: &str,
) -> RenderedChart {
    let bytes = match kind {
        ChartKind::TopPopularity => top_popularity(table, genre),
        ChartKind::TopFollowers => top_followers(table, genre),
        ChartKind::YearDistribution => year_distribution(table, genre),
        ChartKind::ActiveByCountry => active_by_country(table, countries, genre),
        ChartKind::ArtistsPerMillion => per_million(table, countries, genre),
    };
    RenderedChart::svg(kind, bytes)
}

struct Bar {
    label: String,
    value: f64,
}

/// Full-size canvas with a centered message
fn placeholder(title: &str, message: &str) -> Vec<u8> {
    let mut canvas = SvgCanvas::new(WIDTH, HEIGHT);
    canvas.title(title);
    canvas.text(WIDTH / 2.0, HEIGHT / 2.0, message, 16.0, Anchor::Middle);
    canvas.finish()
}

/// Vertical bar chart with rotated category labels
fn bar_chart(
    title: &str,
    y_label: &str,
    x_label: Option<&str>,
    bars: &[Bar],
    value_label: Option<&dyn Fn(f64) -> String>,
) -> Vec<u8> {
    let mut canvas = SvgCanvas::new(WIDTH, HEIGHT);
    canvas.title(title);

    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = MARGIN_TOP + plot_height;
    let max = bars.iter().map(|b| b.value).fold(0.0_f64, f64::max);
    let scale = if max > 0.0 { plot_height / max } else { 0.0 };
    let slot = plot_width / bars.len().max(1) as f64;

    canvas.line(MARGIN_LEFT, baseline, WIDTH - MARGIN_RIGHT, baseline, "#333333");
    canvas.rotated_text(28.0, MARGIN_TOP + plot_height / 2.0, y_label, 14.0, Anchor::Middle, -90.0);
    if let Some(x_label) = x_label {
        canvas.text(WIDTH / 2.0, HEIGHT - 16.0, x_label, 14.0, Anchor::Middle);
    }

    for (i, bar) in bars.iter().enumerate() {
        let height = bar.value * scale;
        let x = MARGIN_LEFT + i as f64 * slot + slot * 0.1;
        let center = x + slot * 0.4;
        canvas.rect(
            x,
            baseline - height,
            slot * 0.8,
            height,
            SUNSET_PALETTE[i % SUNSET_PALETTE.len()],
            None,
        );
        if let Some(format) = value_label {
            canvas.text(center, baseline - height - 6.0, &format(bar.value), 12.0, Anchor::Middle);
        }
        canvas.rotated_text(center, baseline + 14.0, &bar.label, 12.0, Anchor::End, -45.0);
    }

    canvas.finish()
}

fn top_popularity(table: &ArtistTable, genre: &str) -> Vec<u8> {
    let title = format!("Top 10 {} Artists by Spotify Popularity", genre);
    let mut rows: Vec<(&str, u32)> = table
        .iter()
        .filter_map(|r| r.spotify_popularity.map(|p| (r.name.as_str(), p)))
        .collect();
    if rows.is_empty() {
        return placeholder(&title, "No Spotify popularity data available");
    }
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    let bars: Vec<Bar> = rows
        .into_iter()
        .take(TOP_N)
        .map(|(name, popularity)| Bar {
            label: name.to_string(),
            value: f64::from(popularity),
        })
        .collect();
    bar_chart(&title, "Popularity", None, &bars, None)
}

fn top_followers(table: &ArtistTable, genre: &str) -> Vec<u8> {
    let title = format!("Top 10 {} Artists by Spotify Followers", genre);
    let mut rows: Vec<(&str, u64)> = table
        .iter()
        .filter_map(|r| r.spotify_followers.map(|f| (r.name.as_str(), f)))
        .collect();
    if rows.is_empty() {
        return placeholder(&title, "No Spotify follower data available");
    }
    rows.sort_by(|a, b| b.1.cmp(&a.1));

    let bars: Vec<Bar> = rows
        .into_iter()
        .take(TOP_N)
        .map(|(name, followers)| Bar {
            label: name.to_string(),
            value: followers as f64 / 1_000_000.0,
        })
        .collect();
    let millions = |v: f64| format!("{:.1}M", v);
    bar_chart(&title, "Followers (Millions)", None, &bars, Some(&millions))
}

/// Equal-width bins over `min..=max`; the last bin includes `max`
fn histogram(values: &[i32], bins: usize) -> Vec<(f64, f64, usize)> {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Vec::new();
    };
    let (low, high) = if min == max {
        (f64::from(min) - 0.5, f64::from(max) + 0.5)
    } else {
        (f64::from(min), f64::from(max))
    };
    let width = (high - low) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &value in values {
        let index = ((f64::from(value) - low) / width).floor() as usize;
        counts[index.min(bins - 1)] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (low + i as f64 * width, low + (i + 1) as f64 * width, count))
        .collect()
}

fn year_distribution(table: &ArtistTable, genre: &str) -> Vec<u8> {
    let title = format!("Distribution of {} Artists by Year Formed", genre);
    let years: Vec<i32> = table.iter().filter_map(|r| r.year_formed).collect();
    let bins = histogram(&years, HISTOGRAM_BINS);
    if bins.is_empty() {
        return placeholder(&title, "No formation year data available");
    }

    let mut canvas = SvgCanvas::new(WIDTH, HEIGHT);
    canvas.title(&title);

    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - 120.0;
    let baseline = MARGIN_TOP + plot_height;
    let max = bins.iter().map(|b| b.2).max().unwrap_or(0).max(1);
    let bar_width = plot_width / bins.len() as f64;

    canvas.line(MARGIN_LEFT, baseline, WIDTH - MARGIN_RIGHT, baseline, "#333333");
    for (i, (start, _, count)) in bins.iter().enumerate() {
        let height = *count as f64 / max as f64 * plot_height;
        let x = MARGIN_LEFT + i as f64 * bar_width;
        canvas.rect(x, baseline - height, bar_width, height, "#3CB371", Some("#000000"));
        if i % 4 == 0 {
            canvas.text(x, baseline + 18.0, &format!("{:.0}", start), 12.0, Anchor::Middle);
        }
    }
    if let Some((_, end, _)) = bins.last() {
        canvas.text(WIDTH - MARGIN_RIGHT, baseline + 18.0, &format!("{:.0}", end), 12.0, Anchor::Middle);
    }
    canvas.text(MARGIN_LEFT - 8.0, MARGIN_TOP + 4.0, &max.to_string(), 12.0, Anchor::End);
    canvas.text(MARGIN_LEFT - 8.0, baseline, "0", 12.0, Anchor::End);
    canvas.rotated_text(28.0, MARGIN_TOP + plot_height / 2.0, "Number of Artists", 14.0, Anchor::Middle, -90.0);
    canvas.text(WIDTH / 2.0, baseline + 50.0, "Year Formed", 14.0, Anchor::Middle);

    canvas.finish()
}

/// Tile map: one column per region, one tile per country, shaded by count
fn active_by_country(table: &ArtistTable, countries: &CountryReference, genre: &str) -> Vec<u8> {
    let title = format!("Number of Active {} Artists by Country", genre);
    let counts = country_counts(table.iter().filter(|r| r.is_active()));
    if counts.is_empty() {
        return placeholder(&title, "No active artists to map");
    }

    let mut regions: BTreeMap<String, Vec<(String, usize)>> = BTreeMap::new();
    for entry in counts {
        let region = countries
            .lookup(&entry.country)
            .and_then(|c| c.region.clone())
            .unwrap_or_else(|| "Other".to_string());
        regions
            .entry(region)
            .or_default()
            .push((entry.country, entry.artists));
    }
    let max = regions
        .values()
        .flatten()
        .map(|(_, count)| *count)
        .max()
        .unwrap_or(1);

    let column_width = (WIDTH - 40.0) / regions.len() as f64;
    let tile_height = 34.0;
    let tallest = regions.values().map(Vec::len).max().unwrap_or(0);
    let height = (MARGIN_TOP + 40.0 + tallest as f64 * (tile_height + 6.0) + 80.0).max(400.0);

    let mut canvas = SvgCanvas::new(WIDTH, height);
    canvas.title(&title);

    for (column, (region, entries)) in regions.iter().enumerate() {
        let x = 20.0 + column as f64 * column_width;
        canvas.text(x + column_width / 2.0, MARGIN_TOP + 10.0, region, 14.0, Anchor::Middle);
        for (row, (country, count)) in entries.iter().enumerate() {
            let y = MARGIN_TOP + 24.0 + row as f64 * (tile_height + 6.0);
            let shade = *count as f64 / max as f64;
            canvas.rect(
                x + 4.0,
                y,
                column_width - 8.0,
                tile_height,
                &blend("#FDE725", "#440154", shade),
                Some("#FFFFFF"),
            );
            canvas.text(
                x + column_width / 2.0,
                y + tile_height / 2.0 + 4.0,
                &format!("{} ({})", country, count),
                11.0,
                Anchor::Middle,
            );
        }
    }

    let legend_y = height - 40.0;
    canvas.text(20.0, legend_y, "Active Artists:", 12.0, Anchor::Start);
    canvas.rect(120.0, legend_y - 12.0, 20.0, 14.0, &blend("#FDE725", "#440154", 0.0), None);
    canvas.text(146.0, legend_y, "1", 12.0, Anchor::Start);
    canvas.rect(180.0, legend_y - 12.0, 20.0, 14.0, &blend("#FDE725", "#440154", 1.0), None);
    canvas.text(206.0, legend_y, &max.to_string(), 12.0, Anchor::Start);

    canvas.finish()
}

fn per_million(table: &ArtistTable, countries: &CountryReference, genre: &str) -> Vec<u8> {
    let title = format!("{} Artists per Million People", genre);
    let rates = artists_per_million(table, countries);
    if rates.is_empty() {
        return placeholder(&title, "No country has enough artists for a per-million figure");
    }

    let bars: Vec<Bar> = rates
        .into_iter()
        .take(TOP_N)
        .map(|r| Bar {
            label: r.country,
            value: r.per_million,
        })
        .collect();
    bar_chart(&title, "Artists per Million", Some("Country"), &bars, None)
}
