//! SCRFD face detector via ONNX Runtime.
//!
//! The frame is letterboxed into a 640×640 square, run through the model, and
//! the per-stride score/distance/keypoint maps are decoded into boxes in frame
//! coordinates, then de-duplicated with NMS.

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

use super::frame_image;
use crate::analyzer::AnalyzerError;
use crate::types::{BoundingBox, Frame, Landmarks};

const INPUT_SIZE: u32 = 640;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;
const SCORE_THRESHOLD: f32 = 0.5;
const NMS_IOU: f32 = 0.4;
const STRIDES: [u32; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

/// Output tensor positions `(scores, distances, keypoints)` for one stride.
type StrideOutputs = (usize, usize, Option<usize>);

/// Scale and offset applied when fitting a frame into the model input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32) -> Self {
        let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
        let (w, h) = Self::scaled(width, height, scale);
        Self {
            scale,
            pad_x: (INPUT_SIZE - w) / 2,
            pad_y: (INPUT_SIZE - h) / 2,
        }
    }

    fn scaled(width: u32, height: u32, scale: f32) -> (u32, u32) {
        let w = ((width as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
        let h = ((height as f32 * scale).round() as u32).clamp(1, INPUT_SIZE);
        (w, h)
    }

    /// Map a point from model input space back to the frame.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

pub struct ScrfdDetector {
    session: Session,
    layout: [StrideOutputs; 3],
}

impl ScrfdDetector {
    pub fn load(model_path: &Path) -> Result<Self, AnalyzerError> {
        if !model_path.exists() {
            return Err(AnalyzerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        if names.len() < 6 {
            return Err(AnalyzerError::InferenceFailed(format!(
                "SCRFD model needs score and bbox outputs for 3 strides, got {} outputs",
                names.len()
            )));
        }

        let layout = output_layout(&names);
        tracing::info!(path = %model_path.display(), outputs = ?names, ?layout, "loaded SCRFD model");

        Ok(Self { session, layout })
    }

    /// Detect faces, highest confidence first.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, AnalyzerError> {
        let (input, letterbox) = preprocess(frame)?;
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (&stride, &(score_idx, bbox_idx, kps_idx)) in STRIDES.iter().zip(&self.layout) {
            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| AnalyzerError::InferenceFailed(format!("scores/{stride}: {e}")))?;
            let (_, distances) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| AnalyzerError::InferenceFailed(format!("bboxes/{stride}: {e}")))?;
            let keypoints = match kps_idx {
                Some(idx) => Some(
                    outputs[idx]
                        .try_extract_tensor::<f32>()
                        .map_err(|e| AnalyzerError::InferenceFailed(format!("kps/{stride}: {e}")))?
                        .1,
                ),
                None => None,
            };

            candidates.extend(decode_stride(scores, distances, keypoints, stride, &letterbox));
        }

        let faces = nms(candidates, NMS_IOU);
        tracing::debug!(faces = faces.len(), seq = frame.sequence, "SCRFD detect");
        Ok(faces)
    }
}

/// Letterbox a grayscale frame into a 1×3×640×640 tensor.
fn preprocess(frame: &Frame) -> Result<(Array4<f32>, Letterbox), AnalyzerError> {
    let gray: GrayImage = frame_image(frame)?;

    let letterbox = Letterbox::fit(frame.width, frame.height);
    let (w, h) = Letterbox::scaled(frame.width, frame.height, letterbox.scale);
    let resized = imageops::resize(&gray, w, h, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    // Padding is the mean, which normalizes to zero.
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, px) in resized.enumerate_pixels() {
        let v = (px.0[0] as f32 - PIXEL_MEAN) / PIXEL_STD;
        let (ty, tx) = ((y + letterbox.pad_y) as usize, (x + letterbox.pad_x) as usize);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = v;
        }
    }

    Ok((tensor, letterbox))
}

/// Locate score, bbox and kps outputs by name ("score_8", "bbox_8", "kps_8",
/// ...), falling back to the usual export order
/// `[scores 8/16/32, bboxes 8/16/32, kps 8/16/32]`. Keypoints are optional.
fn output_layout(names: &[String]) -> [StrideOutputs; 3] {
    let position = |kind: &str, stride: u32| {
        let want = format!("{kind}_{stride}");
        names.iter().position(|n| *n == want)
    };

    let named: Option<Vec<StrideOutputs>> = STRIDES
        .iter()
        .map(|&s| Some((position("score", s)?, position("bbox", s)?, position("kps", s))))
        .collect();

    match named {
        Some(v) => [v[0], v[1], v[2]],
        None => {
            let kps = |idx: usize| (names.len() >= 9).then_some(idx);
            [(0, 3, kps(6)), (1, 4, kps(7)), (2, 5, kps(8))]
        }
    }
}

/// Decode the anchor-free distance and keypoint predictions of one stride.
fn decode_stride(
    scores: &[f32],
    distances: &[f32],
    keypoints: Option<&[f32]>,
    stride: u32,
    letterbox: &Letterbox,
) -> Vec<BoundingBox> {
    let cells_x = (INPUT_SIZE / stride) as usize;
    let step = stride as f32;

    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score > SCORE_THRESHOLD)
        .filter_map(|(anchor, &score)| {
            let d = distances.get(anchor * 4..anchor * 4 + 4)?;
            let cell = anchor / ANCHORS_PER_CELL;
            let cx = (cell % cells_x) as f32 * step;
            let cy = (cell / cells_x) as f32 * step;

            let (x1, y1) = letterbox.unmap(cx - d[0] * step, cy - d[1] * step);
            let (x2, y2) = letterbox.unmap(cx + d[2] * step, cy + d[3] * step);

            let landmarks = keypoints
                .and_then(|k| k.get(anchor * 10..anchor * 10 + 10))
                .map(|k| -> Landmarks {
                    std::array::from_fn(|i| {
                        letterbox.unmap(cx + k[i * 2] * step, cy + k[i * 2 + 1] * step)
                    })
                });

            Some(BoundingBox {
                x: x1,
                y: y1,
                width: x2 - x1,
                height: y2 - y1,
                confidence: score,
                landmarks,
            })
        })
        .collect()
}

/// Greedy non-maximum suppression; output sorted by confidence.
fn nms(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<BoundingBox> = Vec::new();
    for candidate in boxes {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let iy = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    let inter = ix * iy;
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}
