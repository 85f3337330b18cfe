use facerec_core::{Encoding, EncodingStore, Identity, IdentityRecord, StorageError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use crate::error::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    name TEXT,
    age INTEGER,
    email TEXT,
    face_encoding BLOB
)";

/// A stored row with its SQLite `rowid`.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub rowid: i64,
    pub record: IdentityRecord,
}

/// Identity store backed by a single SQLite file.
///
/// Every operation opens its own connection and drops it before returning,
/// so nothing is held between calls.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Point at a database file. Nothing is opened until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Connection::open(&self.path)?)
    }

    /// Create the `users` table if absent.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.connect()?.execute_batch(SCHEMA)?;
        debug!("schema ready");
        Ok(())
    }

    /// Every `(name, encoding)` in rowid order.
    pub fn load_encodings(&self) -> Result<Vec<(String, Encoding)>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT name, face_encoding FROM users ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (name, blob) = row?;
            let encoding = decode(&name, &blob)?;
            out.push((name, encoding));
        }
        debug!(rows = out.len(), "loaded encodings");
        Ok(out)
    }

    /// Full rows, including metadata, in rowid order.
    pub fn records(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT rowid, name, age, email, face_encoding FROM users ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Vec<u8>>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (rowid, name, age, email, blob) = row?;
            let reference_encoding = decode(&name, &blob)?;
            out.push(StoredRecord {
                rowid,
                record: IdentityRecord {
                    identity: Identity {
                        name,
                        age: age.unwrap_or_default(),
                        email: email.unwrap_or_default(),
                    },
                    reference_encoding,
                },
            });
        }
        Ok(out)
    }

    /// Append a row and return its rowid.
    #[instrument(skip_all, fields(name = %identity.name))]
    pub fn insert(&self, identity: &Identity, encoding: &Encoding) -> Result<i64, StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO users (name, age, email, face_encoding) VALUES (?1, ?2, ?3, ?4)",
            params![identity.name, identity.age, identity.email, encoding.to_blob()],
        )?;
        let rowid = conn.last_insert_rowid();
        debug!(rowid, dim = encoding.dim(), "inserted identity");
        Ok(rowid)
    }

    /// Delete every row named `name`; returns the number removed.
    #[instrument(skip_all, fields(name = %name))]
    pub fn remove(&self, name: &str) -> Result<usize, StoreError> {
        let removed = self
            .connect()?
            .execute("DELETE FROM users WHERE name = ?1", params![name])?;
        debug!(removed, "deleted rows");
        Ok(removed)
    }

    /// Raw encoding blob of one row.
    pub fn encoding_blob(&self, rowid: i64) -> Result<Vec<u8>, StoreError> {
        self.connect()?
            .query_row(
                "SELECT face_encoding FROM users WHERE rowid = ?1",
                params![rowid],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?
            .ok_or(StoreError::RowNotFound(rowid))
    }

    /// Write one row's blob to `<dir>/<db-file>-x-users-<rowid>-face_encoding.bin`.
    pub fn export_encoding(&self, rowid: i64, dir: &Path) -> Result<PathBuf, StoreError> {
        let blob = self.encoding_blob(rowid)?;
        let db_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "facerec.db".to_string());
        let out = dir.join(format!("{db_name}-x-users-{rowid}-face_encoding.bin"));

        std::fs::write(&out, blob).map_err(|source| StoreError::Io {
            path: out.clone(),
            source,
        })?;
        debug!(rowid, path = %out.display(), "exported encoding");
        Ok(out)
    }
}

/// Decode an encoding blob previously written by [`SqliteStore::export_encoding`].
pub fn read_encoding_file(path: &Path) -> Result<Encoding, StoreError> {
    let blob = std::fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&path.display().to_string(), &blob)
}

fn decode(name: &str, blob: &[u8]) -> Result<Encoding, StoreError> {
    Encoding::from_blob(blob).map_err(|source| StoreError::CorruptEncoding {
        name: name.to_string(),
        source,
    })
}

impl EncodingStore for SqliteStore {
    fn initialize(&self) -> Result<(), StorageError> {
        Ok(self.init_schema()?)
    }

    fn load_all(&self) -> Result<Vec<(String, Encoding)>, StorageError> {
        Ok(self.load_encodings()?)
    }

    fn save(&self, identity: &Identity, encoding: &Encoding) -> Result<(), StorageError> {
        self.insert(identity, encoding)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<usize, StorageError> {
        Ok(self.remove(name)?)
    }
}
