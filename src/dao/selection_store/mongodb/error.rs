use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::{StorageError, UniqueField};

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

/// Server error code reported for duplicate keys on a unique index.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required environment variable is unset.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// The driver refused the client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// The server never answered while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// Index creation failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// A query failed.
    #[error("failed to read collection `{collection}`")]
    Read {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    /// A write failed for a reason other than a duplicate key.
    #[error("failed to write collection `{collection}`")]
    Write {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    /// A unique index rejected the write.
    #[error("duplicate key on `{field}`")]
    DuplicateKey { field: UniqueField },
    /// The config row to update does not exist.
    #[error("config `{id}` not found")]
    ConfigNotFound { id: Uuid },
    /// A stored `_id` is not a UUID.
    #[error("invalid identifier `{value}` stored in `{collection}`")]
    InvalidId {
        collection: &'static str,
        value: String,
        #[source]
        source: uuid::Error,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateKey { field } => StorageError::UniqueViolation { field },
            MongoDaoError::ConfigNotFound { id } => {
                StorageError::Rejected(format!("config `{id}` not found"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

/// Whether a unique index rejected the write, whatever command carried it.
pub(super) fn is_duplicate_key(source: &MongoError) -> bool {
    match source.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Map an insert failure on `user_selections` to a duplicate-key error when a unique index fired.
pub(super) fn classify_selection_write(source: MongoError) -> MongoDaoError {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = source.kind.as_ref() {
        if write_error.code == DUPLICATE_KEY_CODE {
            let field = if write_error.message.contains("user_name") {
                UniqueField::UserName
            } else {
                UniqueField::ClubId
            };
            return MongoDaoError::DuplicateKey { field };
        }
    }

    MongoDaoError::Write {
        collection: super::SELECTION_COLLECTION_NAME,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_become_unique_violations() {
        let err: StorageError = MongoDaoError::DuplicateKey {
            field: UniqueField::UserName,
        }
        .into();
        assert_eq!(err.unique_field(), Some(UniqueField::UserName));
    }

    #[test]
    fn other_failures_become_unavailable() {
        let err: StorageError = MongoDaoError::MissingEnvVar { var: "MONGO_URI" }.into();
        assert!(matches!(err, StorageError::Unavailable { .. }));

        let err: StorageError = MongoDaoError::ConfigNotFound { id: Uuid::nil() }.into();
        assert!(matches!(err, StorageError::Rejected(_)));
    }
}
