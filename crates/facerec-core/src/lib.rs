//! facerec-core — Face enrollment and recognition engine.
//!
//! Owns the encoding type, the enrollment and matching flows, and the
//! collaborator traits they are driven through. Face detection and encoding
//! run via ONNX Runtime in [`onnx`].

pub mod analyzer;
pub mod cache;
pub mod encoding;
pub mod enroll;
pub mod error;
pub mod matcher;
pub mod onnx;
pub mod recognize;
pub mod registry;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod testutil;

pub use analyzer::{AnalyzerError, FaceAnalyzer};
pub use cache::EncodingCache;
pub use encoding::{Encoding, EncodingError};
pub use enroll::{enroll, EnrollReport, DEFAULT_SAMPLE_COUNT};
pub use error::{FaceRecError, StorageError};
pub use matcher::{CosineMatcher, DistanceMatcher, Matcher};
pub use recognize::{match_faces, FrameReport, RecognitionSession, DEFAULT_MAX_CAPTURE_FAILURES};
pub use registry::{delete_identity, load_cache};
pub use source::{CaptureError, FrameSource};
pub use store::EncodingStore;
pub use types::{
    BoundingBox, Frame, Identity, IdentityError, IdentityRecord, Label, LabeledFace, Landmarks,
    Observation,
};
