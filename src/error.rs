use mongodb::bson;
use thiserror::Error;

/// Errors surfaced by the person repository and its stores.
///
/// "Not found" is not an error: lookups return `Ok(None)` or an empty `Vec`.
#[derive(Debug, Error)]
pub enum RepoError {
    /// A required field is missing or empty
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The given text is not a valid person id
    #[error("Invalid person id: {0}")]
    InvalidId(String),

    /// The MongoDB driver reported a failure
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// A non-Mongo store is unreachable or rejected the operation
    #[error("Store error: {0}")]
    Backend(String),

    #[error("Failed to encode person document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Failed to decode person document: {0}")]
    Decode(#[from] bson::de::Error),
}

impl RepoError {
    /// True for failures that come from the underlying store.
    pub fn is_database(&self) -> bool {
        matches!(self, RepoError::Database(_) | RepoError::Backend(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RepoError::Validation(_) | RepoError::InvalidId(_))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
