//! User-facing progress text

use arta_common::events::PipelinePhase;

/// Label shown to the user for a pipeline phase
pub fn phase_label(phase: PipelinePhase) -> &'static str {
    match phase {
        PipelinePhase::Fetching => "Fetching Artists",
        PipelinePhase::Normalizing => "Cleaning Data",
        PipelinePhase::Enriching => "Adding Streaming Data",
        PipelinePhase::Persisting => "Completing Analysis",
        PipelinePhase::Done => "Done",
    }
}

/// Progress message rewritten on every pipeline event
pub fn format_progress(genre: &str, phase: PipelinePhase, detail: &str) -> String {
    format!(
        "🔍 Analyzing {} artists:\n\nCurrent phase: {}\nDetails: {}",
        genre,
        phase_label(phase),
        detail
    )
}
