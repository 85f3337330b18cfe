//! Raw buffer → grayscale conversion and dark-frame detection.

use thiserror::Error;

/// Pixels below this value count as dark.
const DARK_PIXEL_LEVEL: u8 = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },
}

fn check_len(buf: &[u8], expected: usize) -> Result<(), ConvertError> {
    if buf.len() < expected {
        return Err(ConvertError::ShortBuffer { expected, actual: buf.len() });
    }
    Ok(())
}

/// Packed YUYV 4:2:2 → luma. Two pixels per 4 bytes: `[Y0, U, Y1, V]`.
pub fn yuyv_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let expected = (width * height * 2) as usize;
    check_len(buf, expected)?;
    Ok(buf[..expected].iter().step_by(2).copied().collect())
}

/// 8-bit GREY passthrough (trims driver padding).
pub fn grey_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let expected = (width * height) as usize;
    check_len(buf, expected)?;
    Ok(buf[..expected].to_vec())
}

/// 16-bit little-endian grayscale → 8-bit by keeping the high byte.
pub fn y16_to_gray(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ConvertError> {
    let expected = (width * height * 2) as usize;
    check_len(buf, expected)?;
    Ok(buf[..expected]
        .chunks_exact(2)
        .map(|px| (u16::from_le_bytes([px[0], px[1]]) >> 8) as u8)
        .collect())
}

/// True when more than `threshold_pct` of pixels are dark. Empty frames are dark.
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark = gray.iter().filter(|&&p| p < DARK_PIXEL_LEVEL).count();
    (dark as f32 / gray.len() as f32) > threshold_pct
}
