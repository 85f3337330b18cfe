//! Draw labeled face rectangles onto a frame and save it.

use anyhow::{Context, Result};
use facerec_core::{Frame, Label, LabeledFace};
use image::{GrayImage, Luma};
use std::path::Path;

use crate::font::{self, GLYPH_HEIGHT};

const BORDER: u32 = 2;
/// Gap between the label's bottom row and the rectangle.
const LABEL_GAP: u32 = 3;
const KNOWN: Luma<u8> = Luma([255]);
const UNKNOWN: Luma<u8> = Luma([0]);

/// Copy of `frame` with a rectangle around each face and its label above it:
/// white for known identities, black for unknown ones.
pub fn annotate(frame: &Frame, faces: &[LabeledFace]) -> Result<GrayImage> {
    let mut img = GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("frame buffer does not match its dimensions")?;

    for face in faces {
        let Some(bounds) = face.region.pixel_bounds(frame.width, frame.height) else {
            continue;
        };
        let color = match face.label {
            Label::Known(_) => KNOWN,
            Label::Unknown => UNKNOWN,
        };
        draw_rect(&mut img, bounds, color);
        draw_label(&mut img, &face.label.to_string(), bounds, color);
    }

    Ok(img)
}

pub fn save_snapshot(path: &Path, frame: &Frame, faces: &[LabeledFace]) -> Result<()> {
    annotate(frame, faces)?
        .save(path)
        .with_context(|| format!("writing snapshot {}", path.display()))
}

fn draw_rect(img: &mut GrayImage, (left, top, right, bottom): (u32, u32, u32, u32), color: Luma<u8>) {
    for y in top..bottom {
        for x in left..right {
            let on_edge = x < left + BORDER
                || x + BORDER >= right
                || y < top + BORDER
                || y + BORDER >= bottom;
            if on_edge {
                img.put_pixel(x, y, color);
            }
        }
    }
}

fn draw_label(img: &mut GrayImage, text: &str, (left, top, _, _): (u32, u32, u32, u32), color: Luma<u8>) {
    let y0 = top.saturating_sub(GLYPH_HEIGHT + LABEL_GAP);
    for (dx, dy) in font::text_pixels(text) {
        let (x, y) = (left + dx, y0 + dy);
        if x < img.width() && y < img.height() {
            img.put_pixel(x, y, color);
        }
    }
}
