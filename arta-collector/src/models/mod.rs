//! Data models for arta-collector
//!
//! - Artist table produced by the normalizer and filled in by enrichment
//! - Country reference rows
//! - Analysis request parameters
//! - Conversational session state

pub mod analysis_session;
pub mod artist;
pub mod country;
pub mod parameters;

pub use analysis_session::{AnalysisSession, SessionState};
pub use artist::{ArtistRecord, ArtistTable};
pub use country::CountryRecord;
pub use parameters::{AnalysisRequest, MAX_ARTISTS_COUNT, MIN_ARTISTS_COUNT};
