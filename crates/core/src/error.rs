use thiserror::Error;

/// Failure reported by the data-access collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Failure reported by the suggestion-text collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SuggestionError {
    #[error("suggestions unavailable: {0}")]
    Unavailable(String),

    #[error("suggestion generation failed: {0}")]
    Generation(String),
}

/// Turns a `NotFound` into `Ok(None)` so callers can treat missing rows as no data.
pub trait NotFoundExt<T> {
    fn found(self) -> Result<Option<T>, StoreError>;
}

impl<T> NotFoundExt<T> for Result<T, StoreError> {
    fn found(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
