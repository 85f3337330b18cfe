//! Encoding store contract.

use crate::encoding::Encoding;
use crate::error::StorageError;
use crate::types::Identity;

/// Persistent home of identity records.
///
/// Implementations open and close their backing resource per call; no state
/// is held across operations.
pub trait EncodingStore {
    /// Ensure the schema exists. Idempotent.
    fn initialize(&self) -> Result<(), StorageError>;

    /// Every stored `(name, encoding)` pair in insertion order. Duplicate
    /// names appear once per row.
    fn load_all(&self) -> Result<Vec<(String, Encoding)>, StorageError>;

    /// Append a record. Does not enforce name uniqueness.
    fn save(&self, identity: &Identity, encoding: &Encoding) -> Result<(), StorageError>;

    /// Remove all records named `name`, returning how many were removed.
    fn delete(&self, name: &str) -> Result<usize, StorageError>;
}

impl<T: EncodingStore + ?Sized> EncodingStore for &T {
    fn initialize(&self) -> Result<(), StorageError> {
        (**self).initialize()
    }

    fn load_all(&self) -> Result<Vec<(String, Encoding)>, StorageError> {
        (**self).load_all()
    }

    fn save(&self, identity: &Identity, encoding: &Encoding) -> Result<(), StorageError> {
        (**self).save(identity, encoding)
    }

    fn delete(&self, name: &str) -> Result<usize, StorageError> {
        (**self).delete(name)
    }
}
