use facerec_core::{EncodingError, StorageError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt encoding for {name}: {source}")]
    CorruptEncoding {
        name: String,
        #[source]
        source: EncodingError,
    },

    #[error("no row with id {0}")]
    RowNotFound(i64),
}

impl From<StoreError> for StorageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CorruptEncoding { name, source } => StorageError::Corrupt { name, source },
            other => StorageError::Backend(other.to_string()),
        }
    }
}
