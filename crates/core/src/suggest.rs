use async_trait::async_trait;

use crate::entity::Tendency;
use crate::error::SuggestionError;

/// Turns numeric trend summaries into a natural-language suggestion.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn generate(
        &self,
        grade_tendency: Tendency,
        submission_tendency: Tendency,
        average_grade: f64,
    ) -> Result<String, SuggestionError>;
}

/// Generator used when no text backend is configured. Always fails.
pub struct NoSuggestions;

#[async_trait]
impl SuggestionGenerator for NoSuggestions {
    async fn generate(
        &self,
        _grade_tendency: Tendency,
        _submission_tendency: Tendency,
        _average_grade: f64,
    ) -> Result<String, SuggestionError> {
        Err(SuggestionError::Unavailable("no suggestion backend configured".into()))
    }
}
