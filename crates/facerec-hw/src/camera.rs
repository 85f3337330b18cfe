//! V4L2 webcam capture via the `v4l` crate.

use facerec_core::{CaptureError, Frame, FrameSource};
use std::path::Path;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use crate::convert;

const REQUEST_WIDTH: u32 = 640;
const REQUEST_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;
const DARK_THRESHOLD: f32 = 0.95;

/// A discovered V4L2 capture device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed; luma is extracted.
    Yuyv,
    /// 8-bit grayscale.
    Grey,
    /// 16-bit little-endian grayscale.
    Y16,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"GREY" => Some(Self::Grey),
            b"Y16 " | b"Y16\0" => Some(Self::Y16),
            _ => None,
        }
    }
}

/// An open V4L2 camera. The device is released when this value is dropped.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a capture device by path (e.g. "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CaptureError> {
        if !Path::new(device_path).exists() {
            return Err(CaptureError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.raw_os_error() == Some(16) || e.to_string().contains("busy") {
                CaptureError::DeviceBusy
            } else {
                CaptureError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CaptureError::ReadFailed(format!("failed to query capabilities: {e}")))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CaptureError::Format(format!("{device_path} is not a capture device")));
        }

        let mut fmt = device
            .format()
            .map_err(|e| CaptureError::Format(format!("failed to get format: {e}")))?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUEST_WIDTH;
        fmt.height = REQUEST_HEIGHT;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CaptureError::Format(format!("failed to set format: {e}")))?;

        let pixel_format = PixelFormat::from_fourcc(negotiated.fourcc).ok_or_else(|| {
            CaptureError::Format(format!(
                "unsupported pixel format {:?} (need YUYV, GREY or Y16)",
                negotiated.fourcc
            ))
        })?;

        tracing::info!(
            device = device_path,
            card = %caps.card,
            width = negotiated.width,
            height = negotiated.height,
            format = ?pixel_format,
            "opened camera"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            pixel_format,
        })
    }

    /// Capture and discard `count` frames so auto-exposure can settle.
    pub fn warm_up(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        tracing::debug!(count, "discarding warmup frames");
        for _ in 0..count {
            if let Err(e) = self.capture() {
                tracing::debug!(error = %e, "warmup frame failed");
            }
        }
    }

    fn to_gray(&self, buf: &[u8]) -> Result<Vec<u8>, CaptureError> {
        let converted = match self.pixel_format {
            PixelFormat::Yuyv => convert::yuyv_to_gray(buf, self.width, self.height),
            PixelFormat::Grey => convert::grey_to_gray(buf, self.width, self.height),
            PixelFormat::Y16 => convert::y16_to_gray(buf, self.width, self.height),
        };
        converted.map_err(|e| CaptureError::ReadFailed(e.to_string()))
    }

    /// List V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        (0..16)
            .map(|i| format!("/dev/video{i}"))
            .filter(|path| Path::new(path).exists())
            .filter_map(|path| {
                let caps = Device::with_path(&path).ok()?.query_caps().ok()?;
                caps.capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                    .then(|| DeviceInfo {
                        path,
                        name: caps.card.clone(),
                        driver: caps.driver.clone(),
                        bus: caps.bus.clone(),
                    })
            })
            .collect()
    }
}

impl FrameSource for Camera {
    fn capture(&mut self) -> Result<Frame, CaptureError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CaptureError::ReadFailed(format!("failed to create mmap stream: {e}")))?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CaptureError::ReadFailed(format!("failed to dequeue buffer: {e}")))?;

        let data = self.to_gray(buf)?;
        let is_dark = convert::is_dark_frame(&data, DARK_THRESHOLD);

        Ok(Frame {
            data,
            width: self.width,
            height: self.height,
            sequence: meta.sequence,
            is_dark,
        })
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        tracing::debug!(device = %self.device_path, "released camera");
    }
}
