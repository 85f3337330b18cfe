use thiserror::Error;

use crate::encoding::EncodingError;
use crate::source::CaptureError;
use crate::types::IdentityError;

/// Failures of the encoding store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("store unavailable: {0}")]
    Backend(String),
    #[error("corrupt encoding stored for {name}: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: EncodingError,
    },
}

/// Errors surfaced to the user action that triggered a flow.
#[derive(Error, Debug)]
pub enum FaceRecError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),
    #[error("no face detected in the captured frames")]
    NoFaceDetected,
    #[error("no user found with the name '{0}'")]
    UserNotFound(String),
    #[error("invalid identity: {0}")]
    InvalidIdentity(#[from] IdentityError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
}
