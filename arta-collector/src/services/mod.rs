//! Business logic services

pub mod country_reference;
pub mod export;
pub mod musicbrainz_client;
pub mod pipeline;
pub mod popularity_enricher;
pub mod record_normalizer;
pub mod spotify_client;

pub use country_reference::CountryReference;
pub use export::{export_table, ExportError};
pub use musicbrainz_client::{MusicBrainzClient, MusicBrainzError, RawArtistRecord};
pub use pipeline::{
    AnalysisPipeline, AnalysisResult, AnalysisRunner, PipelineError, PipelineOutcome,
};
pub use popularity_enricher::{EnrichStats, PopularityEnricher};
pub use record_normalizer::{normalize, NormalizeOutcome, NormalizeStats};
pub use spotify_client::{PopularitySource, SpotifyClient, SpotifyCredentials, SpotifyError};
