//! Analysis request parameters

use arta_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Smallest artist count a user may request
pub const MIN_ARTISTS_COUNT: u32 = 10;
/// Largest artist count a user may request
pub const MAX_ARTISTS_COUNT: u32 = 1000;

/// One pipeline run's input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Catalog genre tag, trimmed and non-empty
    pub genre: String,
    /// Target number of catalog records to page through
    pub count: u32,
}

impl AnalysisRequest {
    /// Build a request, enforcing a non-empty genre and the count bounds
    pub fn new(genre: impl Into<String>, count: u32) -> Result<Self> {
        let genre = genre.into().trim().to_string();
        if genre.is_empty() {
            return Err(Error::InvalidInput("genre must not be empty".to_string()));
        }
        if !(MIN_ARTISTS_COUNT..=MAX_ARTISTS_COUNT).contains(&count) {
            return Err(Error::InvalidInput(format!(
                "count must be between {} and {}, got {}",
                MIN_ARTISTS_COUNT, MAX_ARTISTS_COUNT, count
            )));
        }
        Ok(Self { genre, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_trims_genre() {
        let request = AnalysisRequest::new("  hip hop ", 50).unwrap();
        assert_eq!(request.genre, "hip hop");
        assert_eq!(request.count, 50);
    }

    #[test]
    fn test_request_rejects_blank_genre() {
        assert!(AnalysisRequest::new("   ", 50).is_err());
    }

    #[test]
    fn test_request_count_bounds() {
        assert!(AnalysisRequest::new("jazz", 9).is_err());
        assert!(AnalysisRequest::new("jazz", 10).is_ok());
        assert!(AnalysisRequest::new("jazz", 1000).is_ok());
        assert!(AnalysisRequest::new("jazz", 1001).is_err());
    }
}
