//! facerec-store — Named face encodings persisted in SQLite.

pub mod error;
pub mod sqlite;

pub use error::StoreError;
pub use sqlite::{read_encoding_file, SqliteStore, StoredRecord};
