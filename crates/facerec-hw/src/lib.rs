//! facerec-hw — Webcam capture over V4L2.
//!
//! Frames are delivered as 8-bit grayscale through the
//! [`facerec_core::FrameSource`] trait.

pub mod camera;
pub mod convert;

pub use camera::{Camera, DeviceInfo, PixelFormat};
