//! Face encoding vectors: averaging, distance metrics and the blob codec.
//!
//! An [`Encoding`] is treated as an opaque fixed-length descriptor. The only
//! arithmetic this crate does on it is the element-wise mean used to build a
//! reference encoding from an enrollment burst.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BLOB_MAGIC: &[u8; 4] = b"FENC";
const BLOB_VERSION: u8 = 1;
/// magic + version + u32 dimension
const BLOB_HEADER_LEN: usize = 4 + 1 + 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("cannot average an empty set of encodings")]
    Empty,
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("corrupt encoding blob: {0}")]
    Corrupt(String),
}

/// Fixed-dimensionality face descriptor produced by a face analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Element-wise mean of `samples`.
    ///
    /// All samples must share one dimensionality. Accumulates in f64 so the
    /// result does not depend on sample order beyond the final rounding.
    pub fn mean(samples: &[Encoding]) -> Result<Encoding, EncodingError> {
        let first = samples.first().ok_or(EncodingError::Empty)?;
        let dim = first.dim();

        let mut sums = vec![0.0f64; dim];
        for sample in samples {
            if sample.dim() != dim {
                return Err(EncodingError::DimensionMismatch {
                    expected: dim,
                    got: sample.dim(),
                });
            }
            for (acc, v) in sums.iter_mut().zip(&sample.values) {
                *acc += f64::from(*v);
            }
        }

        let n = samples.len() as f64;
        Ok(Encoding {
            values: sums.into_iter().map(|s| (s / n) as f32).collect(),
        })
    }

    /// Euclidean distance, or `None` when dimensions differ.
    pub fn euclidean_distance(&self, other: &Encoding) -> Option<f32> {
        if self.dim() != other.dim() {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                .sqrt(),
        )
    }

    /// Cosine similarity in [-1, 1], or `None` when dimensions differ.
    pub fn similarity(&self, other: &Encoding) -> Option<f32> {
        if self.dim() != other.dim() {
            return None;
        }

        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;
        for (a, b) in self.values.iter().zip(&other.values) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        Some(if denom > 0.0 { dot / denom } else { 0.0 })
    }

    /// Serialize to the on-disk blob format.
    ///
    /// ```text
    /// "FENC" | version:u8 | dim:u32 LE | dim × f32 LE
    /// ```
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(BLOB_HEADER_LEN + self.dim() * 4);
        blob.extend_from_slice(BLOB_MAGIC);
        blob.push(BLOB_VERSION);
        blob.extend_from_slice(&(self.dim() as u32).to_le_bytes());
        for v in &self.values {
            blob.extend_from_slice(&v.to_le_bytes());
        }
        blob
    }

    /// Parse a blob written by [`to_blob`](Self::to_blob). Bit-exact.
    pub fn from_blob(blob: &[u8]) -> Result<Encoding, EncodingError> {
        if blob.len() < BLOB_HEADER_LEN {
            return Err(EncodingError::Corrupt(format!(
                "blob too short: {} bytes",
                blob.len()
            )));
        }
        if &blob[..4] != BLOB_MAGIC {
            return Err(EncodingError::Corrupt("bad magic".into()));
        }
        if blob[4] != BLOB_VERSION {
            return Err(EncodingError::Corrupt(format!(
                "unsupported version {}",
                blob[4]
            )));
        }

        let dim = u32::from_le_bytes([blob[5], blob[6], blob[7], blob[8]]) as usize;
        if dim == 0 {
            return Err(EncodingError::Corrupt("zero dimension".into()));
        }

        let payload = &blob[BLOB_HEADER_LEN..];
        if payload.len() != dim * 4 {
            return Err(EncodingError::Corrupt(format!(
                "expected {} payload bytes for dim {dim}, got {}",
                dim * 4,
                payload.len()
            )));
        }

        let values = payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Encoding { values })
    }
}
