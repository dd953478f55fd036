use thiserror::Error;

use crate::connection::ConnectionError;
use crate::runner::RunnerError;

/// Errors raised while migrating keys and databases.
///
/// Key-scoped variants are captured per key and folded into a
/// `Database` aggregate; the database-scoped variants abort the run.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("failed to look up the type of key `{key}`")]
    TypeLookupFailed {
        key: String,
        #[source]
        source: ConnectionError,
    },
    #[error("key `{key}` has unsupported type `{key_type}`")]
    UnsupportedType { key: String, key_type: String },
    #[error("failed to read key `{key}` from the source")]
    ReadFailed {
        key: String,
        #[source]
        source: ConnectionError,
    },
    #[error("failed to write key `{key}` to the destination")]
    WriteFailed {
        key: String,
        #[source]
        source: ConnectionError,
    },
    #[error("failed to acquire a connection for key `{key}`")]
    ConnectionAcquireFailed {
        key: String,
        #[source]
        source: ConnectionError,
    },
    #[error("[db {db}] failed to clear the destination database")]
    ClearFailed {
        db: u32,
        #[source]
        source: ConnectionError,
    },
    #[error("[db {db}] failed to list source keys")]
    KeyListingFailed {
        db: u32,
        #[source]
        source: ConnectionError,
    },
    #[error("[db {db}] worker pool failed")]
    Runner {
        db: u32,
        #[source]
        source: RunnerError,
    },
    #[error("[db {db}] {failed} of {total} keys failed to migrate")]
    Database { db: u32, failed: usize, total: usize },
}

impl MigrationError {
    /// Whether the underlying connection is unusable after this error.
    pub fn is_connection_fault(&self) -> bool {
        match self {
            MigrationError::TypeLookupFailed { source, .. }
            | MigrationError::ReadFailed { source, .. }
            | MigrationError::WriteFailed { source, .. }
            | MigrationError::ConnectionAcquireFailed { source, .. }
            | MigrationError::ClearFailed { source, .. }
            | MigrationError::KeyListingFailed { source, .. } => source.is_connection_fault(),
            MigrationError::UnsupportedType { .. }
            | MigrationError::Runner { .. }
            | MigrationError::Database { .. } => false,
        }
    }
}
