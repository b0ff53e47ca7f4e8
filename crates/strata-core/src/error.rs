//! Error types for the strata persistence core.

use thiserror::Error;

/// Result type alias using strata's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for persistence operations.
///
/// Every store failure is surfaced as exactly one of these kinds with the
/// underlying driver error preserved as its cause. Retry policy belongs to
/// callers; nothing in this crate retries internally.
#[derive(Error, Debug)]
pub enum Error {
    /// A required row was absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A create violated a uniqueness invariant.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Query execution or result decoding failed on a select/count/search.
    #[error("Read failure on {context}: {source}")]
    Read {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// The store rejected an insert.
    #[error("Creation failure on {context}: {source}")]
    Creation {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// The store rejected an update or delete.
    #[error("Modification failure on {context}: {source}")]
    Modification {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    /// Caller-supplied input was rejected before reaching the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a driver error as a read failure.
    pub fn read(context: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Read {
            context: context.into(),
            source,
        }
    }

    /// Wrap a driver error as a creation failure.
    pub fn creation(context: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Creation {
            context: context.into(),
            source,
        }
    }

    /// Wrap a driver error as a modification failure.
    pub fn modification(context: impl Into<String>, source: sqlx::Error) -> Self {
        Error::Modification {
            context: context.into(),
            source,
        }
    }

    /// Whether a driver error is a unique-constraint violation.
    ///
    /// Inserts racing on the same uniqueness invariant rely on the store's
    /// constraint instead of a check-then-insert pre-read; the violation is
    /// mapped to [`Error::AlreadyExists`] at the write site.
    pub fn is_unique_violation(source: &sqlx::Error) -> bool {
        match source {
            sqlx::Error::Database(db) => {
                matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
