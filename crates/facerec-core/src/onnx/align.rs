//! Landmark alignment onto the ArcFace 112×112 template.
//!
//! A four-parameter similarity (uniform scale, rotation, translation) is
//! fitted in closed form from the five detected keypoints to the template,
//! then the frame is resampled through its inverse.

use image::imageops::interpolate_bilinear;
use image::{GrayImage, Luma};

use crate::types::Landmarks;

pub const ALIGNED_SIZE: u32 = 112;

/// Keypoint positions ArcFace models expect in a 112×112 crop.
const TEMPLATE: Landmarks = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// `q = [a -b; b a] · p + t`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Least-squares fit mapping `src` onto `dst`.
    ///
    /// Returns `None` when the source points coincide.
    pub fn estimate(src: &Landmarks, dst: &Landmarks) -> Option<Self> {
        let (sx, sy) = centroid(src);
        let (dx, dy) = centroid(dst);

        let (mut dot, mut cross, mut spread) = (0.0f32, 0.0f32, 0.0f32);
        for (&(px, py), &(qx, qy)) in src.iter().zip(dst) {
            let (px, py) = (px - sx, py - sy);
            let (qx, qy) = (qx - dx, qy - dy);
            dot += px * qx + py * qy;
            cross += px * qy - py * qx;
            spread += px * px + py * py;
        }
        if spread <= f32::EPSILON {
            return None;
        }

        let (a, b) = (dot / spread, cross / spread);
        Some(Self {
            a,
            b,
            tx: dx - (a * sx - b * sy),
            ty: dy - (b * sx + a * sy),
        })
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.a + self.b * self.b;
        if det <= f32::EPSILON {
            return None;
        }
        let (a, b) = (self.a / det, -self.b / det);
        Some(Self {
            a,
            b,
            tx: -(a * self.tx - b * self.ty),
            ty: -(b * self.tx + a * self.ty),
        })
    }
}

fn centroid(points: &Landmarks) -> (f32, f32) {
    let n = points.len() as f32;
    let (x, y) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    (x / n, y / n)
}

/// Warp the face described by `landmarks` into a canonical 112×112 crop.
/// Pixels that fall outside the frame are black.
pub fn align(image: &GrayImage, landmarks: &Landmarks) -> Option<GrayImage> {
    let to_frame = Similarity::estimate(landmarks, &TEMPLATE)?.inverse()?;

    Some(GrayImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |x, y| {
        let (sx, sy) = to_frame.apply((x as f32, y as f32));
        interpolate_bilinear(image, sx, sy).unwrap_or(Luma([0]))
    }))
}
