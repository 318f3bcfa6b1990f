/// Error types shared by the profile store and the backup dispatcher

use std::path::PathBuf;

use thiserror::Error;

/// Rejected profile fields, checked before anything is written to the store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("odoobup does not support server version {0:.1}")]
    UnsupportedVersion(f64),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The data directory or store file is unusable. Callers treat this as fatal.
    #[error("failed to initialize profile store at {}: {reason}", path.display())]
    Init { path: PathBuf, reason: String },

    #[error("the ID {id} was not found")]
    NotFound { id: u64 },

    #[error("profile record {key} is corrupt: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to encode profile: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("profile store error: {0}")]
    Storage(#[from] redb::Error),
}

macro_rules! storage_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    StoreError::Storage(err.into())
                }
            }
        )*
    };
}

storage_error_from!(
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Per-profile backup failure. Every variant names the server and database
/// so the batch report can identify it; the master secret is never included.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error(transparent)]
    Resolve(#[from] StoreError),

    #[error("{server_url}, database: {database}... connection refused ({source})")]
    Transport {
        server_url: String,
        database: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{server_url}, database: {database}... database does not exist or access denied")]
    FileOpen {
        server_url: String,
        database: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{server_url}, database: {database}... refusing unsafe backup file name {filename:?}")]
    UnsafeFilename {
        server_url: String,
        database: String,
        filename: String,
    },

    #[error("{server_url}, database: {database}... backup transfer failed: {source}")]
    StreamCopy {
        server_url: String,
        database: String,
        #[source]
        source: std::io::Error,
    },
}
