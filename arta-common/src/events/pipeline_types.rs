//! Pipeline phase type definitions
//!
//! Supporting types for analysis pipeline progress tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a single analysis pipeline run
///
/// A run moves strictly forward:
/// FETCHING → NORMALIZING → ENRICHING → PERSISTING → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelinePhase {
    /// Paging through the artist catalog
    Fetching,
    /// Validating, deriving and filtering records
    Normalizing,
    /// Attaching streaming popularity metrics
    Enriching,
    /// Writing the export file
    Persisting,
    /// Run finished (with or without results)
    Done,
}

impl PipelinePhase {
    /// All phases in execution order
    pub const ALL: [PipelinePhase; 5] = [
        PipelinePhase::Fetching,
        PipelinePhase::Normalizing,
        PipelinePhase::Enriching,
        PipelinePhase::Persisting,
        PipelinePhase::Done,
    ];

    /// Stable identifier used in logs and SSE payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Fetching => "FETCHING",
            PipelinePhase::Normalizing => "NORMALIZING",
            PipelinePhase::Enriching => "ENRICHING",
            PipelinePhase::Persisting => "PERSISTING",
            PipelinePhase::Done => "DONE",
        }
    }

    /// Position in the execution order (0-based)
    pub fn ordinal(&self) -> usize {
        match self {
            PipelinePhase::Fetching => 0,
            PipelinePhase::Normalizing => 1,
            PipelinePhase::Enriching => 2,
            PipelinePhase::Persisting => 3,
            PipelinePhase::Done => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run produced no analysable artists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NothingFoundReason {
    /// The catalog returned no records for the tag
    NoRecords,
    /// Records were returned but none survived cleaning
    AllFiltered,
}

impl fmt::Display for NothingFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NothingFoundReason::NoRecords => f.write_str("no catalog records"),
            NothingFoundReason::AllFiltered => f.write_str("all records filtered out"),
        }
    }
}
