use std::{error::Error, fmt};
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Column guarded by a uniqueness constraint in the selections table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    /// Another selection already claims the club.
    ClubId,
    /// The user already owns a selection.
    UserName,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::ClubId => f.write_str("club_id"),
            UniqueField::UserName => f.write_str("user_name"),
        }
    }
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or failed unexpectedly.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness constraint refused the write.
    #[error("unique constraint violated on `{field}`")]
    UniqueViolation { field: UniqueField },
    /// The store refused the request as invalid.
    #[error("storage rejected the request: {0}")]
    Rejected(String),
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether the failure comes from a uniqueness constraint.
    pub fn unique_field(&self) -> Option<UniqueField> {
        match self {
            StorageError::UniqueViolation { field } => Some(*field),
            _ => None,
        }
    }
}
