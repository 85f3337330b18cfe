//! Frame source collaborator.

use thiserror::Error;

use crate::types::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    Format(String),
    #[error("read failed: {0}")]
    ReadFailed(String),
}

/// Something that yields camera frames one at a time.
///
/// Dropping the source releases the underlying device.
pub trait FrameSource {
    fn capture(&mut self) -> Result<Frame, CaptureError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        (**self).capture()
    }
}
