//! Report building: summary statistics and charts over an artist table

pub mod charts;
pub mod summary;
pub mod svg;

pub use charts::{render_chart, ChartChoice, ChartKind, RenderedChart, UnknownChart};
pub use summary::AnalysisSummary;

use crate::models::ArtistTable;
use crate::services::country_reference::CountryReference;

/// Read-only view bundling what every report needs
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder<'a> {
    table: &'a ArtistTable,
    countries: &'a CountryReference,
    genre: &'a str,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(table: &'a ArtistTable, countries: &'a CountryReference, genre: &'a str) -> Self {
        Self {
            table,
            countries,
            genre,
        }
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary::compute(self.table, self.countries, self.genre)
    }

    pub fn chart(&self, kind: ChartKind) -> RenderedChart {
        render_chart(kind, self.table, self.countries, self.genre)
    }

    /// Render every chart `choice` selects, in menu order
    pub fn charts(&self, choice: ChartChoice) -> Vec<RenderedChart> {
        choice.kinds().into_iter().map(|kind| self.chart(kind)).collect()
    }
}
